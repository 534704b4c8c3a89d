/*
Calibración de detección de caídas con IMU - Rust Puro

Pipeline offline que:
1. Carga una grabación etiquetada (t,ax,ay,az,gx,gy,gz,label)
2. Ventanea la señal y calcula features por ventana
3. Resume percentiles por feature (y por clase con --policy umbral)
4. Deriva los parámetros triangulares y los persiste como JSON + informe

Para calibrar:
    ./target/release/caidoscopio --in data/datos_imu.txt \
        --out-json fuzzy_params.json --out-report informe.txt \
        --win 1.0 --hop 0.5

Después, usar el JSON con el binario replay_scores o con FuzzyEngine::from_params.
*/

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

use caidoscopio::calibration::{
    calibrate, write_features_csv, write_params_json, write_report, CalibrationConfig,
};
use caidoscopio::csv_loader::load_samples;
use caidoscopio::partition::PartitionPolicy;

struct CliOptions {
    infile: PathBuf,
    out_json: PathBuf,
    out_report: PathBuf,
    out_features: Option<PathBuf>,
    cfg: CalibrationConfig,
}

fn usage() -> &'static str {
    "Uso: caidoscopio --in <grabacion.txt> [--out-json fuzzy_params.json] \
     [--out-report informe.txt] [--out-features ventanas.csv] \
     [--win 1.0] [--hop 0.5] [--max-g 3.0] [--max-dps 400] \
     [--policy cuartiles|umbral]"
}

fn parse_args() -> Result<CliOptions> {
    let mut infile: Option<PathBuf> = None;
    let mut out_json = PathBuf::from("fuzzy_params.json");
    let mut out_report = PathBuf::from("informe_caidas.txt");
    let mut out_features: Option<PathBuf> = None;
    let mut cfg = CalibrationConfig::default();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = || {
            args.next()
                .ok_or_else(|| anyhow!("Falta el valor de {}\n{}", arg, usage()))
        };
        match arg.as_str() {
            "--in" => infile = Some(PathBuf::from(value()?)),
            "--out-json" => out_json = PathBuf::from(value()?),
            "--out-report" => out_report = PathBuf::from(value()?),
            "--out-features" => out_features = Some(PathBuf::from(value()?)),
            "--win" => cfg.window.win_s = value()?.parse().context("--win inválido")?,
            "--hop" => cfg.window.hop_s = value()?.parse().context("--hop inválido")?,
            "--max-g" => cfg.max_g = value()?.parse().context("--max-g inválido")?,
            "--max-dps" => cfg.max_dps = value()?.parse().context("--max-dps inválido")?,
            "--policy" => {
                let v = value()?;
                cfg.policy = PartitionPolicy::from_arg(&v)
                    .ok_or_else(|| anyhow!("Política desconocida '{}'\n{}", v, usage()))?;
            }
            _ => bail!("Argumento desconocido '{}'\n{}", arg, usage()),
        }
    }

    let infile = infile.ok_or_else(|| anyhow!("Debes indicar --in\n{}", usage()))?;
    Ok(CliOptions {
        infile,
        out_json,
        out_report,
        out_features,
        cfg,
    })
}

fn main() -> Result<()> {
    println!("📐 Calibración difusa de caídas\n");

    let opts = parse_args()?;

    let samples = load_samples(&opts.infile)
        .with_context(|| format!("No se pudo cargar {:?}", opts.infile))?;
    println!("✅ Grabación cargada: {} muestras", samples.len());

    let outcome = calibrate(&samples, &opts.cfg)?;
    println!(
        "✅ Ventanas: {} | fs≈{:.2} Hz | win={} hop={} muestras\n",
        outcome.windowed.windows.len(),
        outcome.windowed.fs,
        outcome.windowed.win_n,
        outcome.windowed.hop_n
    );

    println!("=== Resumen (percentiles) ===");
    for (name, fp) in &outcome.params.features {
        if let Some(st) = &fp.percentiles {
            println!(
                "{:12} p25={:.3} p50={:.3} p75={:.3} p90={:.3}",
                name, st.p25, st.p50, st.p75, st.p90
            );
        }
        if let Some(thr) = &fp.thresholds {
            if let (Some(adl), Some(fall), Some(t)) = (thr.adl_p95, thr.fall_p50, thr.thr) {
                println!("{:12} ADL p95={:.3} FALL p50={:.3} thr≈{:.3}", name, adl, fall, t);
            }
        }
    }

    write_params_json(&opts.out_json, &outcome.params)?;
    println!("\n✅ Parámetros guardados -> {:?}", opts.out_json);

    write_report(&opts.out_report, &outcome.report)?;
    println!("✅ Informe guardado -> {:?}", opts.out_report);

    if let Some(path) = &opts.out_features {
        write_features_csv(path, &outcome.windowed)?;
        println!("✅ Features por ventana -> {:?}", path);
    }

    println!("\nSiguiente paso: replay_scores --params {:?} <grabacion.txt>", opts.out_json);
    Ok(())
}
