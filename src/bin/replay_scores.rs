use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use crossbeam_channel::bounded;

use caidoscopio::csv_loader::load_samples;
use caidoscopio::fuzzy::{FuzzyEngine, FuzzyParameterSet};
use caidoscopio::hysteresis::HysteresisDecider;
use caidoscopio::types::Sample;

struct ReplayOptions {
    recording: PathBuf,
    params: Option<PathBuf>,
    hi: f64,
    lo: f64,
    quiet: bool,
}

fn parse_args() -> Result<ReplayOptions> {
    let mut recording: Option<PathBuf> = None;
    let mut params: Option<PathBuf> = None;
    let mut hi = 0.7;
    let mut lo = 0.5;
    let mut quiet = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--params" => {
                let v = args.next().ok_or_else(|| anyhow!("Falta el valor de --params"))?;
                params = Some(PathBuf::from(v));
            }
            "--hi" => {
                let v = args.next().ok_or_else(|| anyhow!("Falta el valor de --hi"))?;
                hi = v.parse()?;
            }
            "--lo" => {
                let v = args.next().ok_or_else(|| anyhow!("Falta el valor de --lo"))?;
                lo = v.parse()?;
            }
            "--quiet" => quiet = true,
            _ => {
                if recording.is_some() {
                    bail!(
                        "Uso: replay_scores [--params fuzzy_params.json] [--hi 0.7] [--lo 0.5] [--quiet] <grabacion.txt>"
                    );
                }
                recording = Some(PathBuf::from(arg));
            }
        }
    }

    let recording = recording.ok_or_else(|| anyhow!("Debes especificar una grabación"))?;
    if hi <= lo {
        bail!("--hi debe ser mayor que --lo (hi={}, lo={})", hi, lo);
    }
    Ok(ReplayOptions {
        recording,
        params,
        hi,
        lo,
        quiet,
    })
}

fn main() -> Result<()> {
    let opts = parse_args()?;
    println!("🎞️  Reproduciendo grabación {:?}", opts.recording);

    let engine = match &opts.params {
        Some(path) => {
            let params = FuzzyParameterSet::load(path)?;
            println!("✅ Parámetros calibrados cargados de {:?}", path);
            FuzzyEngine::from_params(&params)?
        }
        None => {
            println!("ℹ️  Sin --params: usando los conjuntos caracterizados por defecto");
            FuzzyEngine::from_params(&FuzzyParameterSet::characterized())?
        }
    };

    let samples = load_samples(&opts.recording)?;
    println!("✅ {} muestras | umbrales hi={} lo={}\n", samples.len(), opts.hi, opts.lo);

    // Hilo productor alimentando el canal acotado, como haría la capa de
    // adquisición en tiempo real; el consumidor puntúa y decide.
    let (tx, rx) = bounded::<Sample>(100);
    std::thread::spawn(move || {
        for sample in samples {
            if tx.send(sample).is_err() {
                break;
            }
        }
    });

    let mut decider = HysteresisDecider::new(opts.hi, opts.lo);
    let mut frame = 0u64;
    let mut skipped = 0u64;
    let mut episodes = 0u64;
    let mut max_score: f64 = 0.0;
    let mut was_active = false;

    while let Ok(sample) = rx.recv() {
        frame += 1;
        let a = sample.a_mag();
        let w = sample.w_mag();
        if !a.is_finite() || !w.is_finite() {
            skipped += 1;
            continue;
        }

        let score = engine.score(a, w);
        let active = decider.update(score);
        max_score = max_score.max(score);

        if active && !was_active {
            episodes += 1;
            println!("🚨 CAÍDA detectada en t={:.3}s (score={:.2})", sample.t, score);
        } else if !active && was_active {
            println!("✅ Recuperado en t={:.3}s (score={:.2})", sample.t, score);
        }
        was_active = active;

        if !opts.quiet {
            println!(
                "[{:06}] t={:7.3}s | |a|={:.3}g |ω|={:7.1}°/s | score={:.2} | label={} | {}",
                frame,
                sample.t,
                a,
                w,
                score,
                sample.label.as_str(),
                if active { "CAÍDA" } else { "ok" }
            );
        }
    }

    println!("\n=== Resumen ===");
    println!("Muestras puntuadas: {} (ilegibles: {})", frame - skipped, skipped);
    println!("Episodios de caída: {}", episodes);
    println!("Score máximo: {:.2}", max_score);
    if engine.fallback_count() > 0 {
        println!("⚠️  Evaluaciones degradadas a 0.0: {}", engine.fallback_count());
    }

    Ok(())
}
