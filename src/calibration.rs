use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write as _;
use std::path::Path;

use thiserror::Error;

use crate::csv_loader::LoaderError;
use crate::fuzzy::{FeatureParams, FuzzyParameterSet, TriangularSet};
use crate::partition::{trimf_around_threshold, trimf_from_quartiles, PartitionPolicy};
use crate::stats::{ClassSummary, FeatureDistribution};
use crate::types::{ActivityLabel, Sample, TILT_DELTA_HI};
use crate::windowing::{
    compute_windows, compute_windows_for_class, WindowConfig, Windowed, WindowingError,
    FEATURE_NAMES,
};

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Windowing(#[from] WindowingError),

    #[error("Error de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuración de una pasada de calibración.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationConfig {
    pub window: WindowConfig,
    /// Cota superior del universo de aceleración (g)
    pub max_g: f64,
    /// Cota superior del universo de giro (°/s)
    pub max_dps: f64,
    pub policy: PartitionPolicy,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            max_g: crate::types::DEFAULT_MAX_G,
            max_dps: crate::types::DEFAULT_MAX_DPS,
            policy: PartitionPolicy::Quartile,
        }
    }
}

/// Resultado de la calibración: el artefacto, las ventanas de las que salió
/// y el informe legible.
#[derive(Debug)]
pub struct CalibrationOutcome {
    pub params: FuzzyParameterSet,
    pub windowed: Windowed,
    pub report: String,
}

/// Features que calibra la política de umbral (las tres entradas compactas
/// del modelo difuso).
const THRESHOLD_FEATURES: [&str; 3] = ["impact_g", "omega_peak", "tilt_delta"];

/// Ejecuta la calibración completa sobre una grabación ya cargada.
///
/// Política de cuartiles: ventanea solo las muestras FALL y deriva los nueve
/// features de sus cuartiles; sin muestras FALL la calibración aborta.
/// Política de umbral: ventanea toda la grabación con etiqueta mayoritaria y
/// ancla los conjuntos en el punto medio ADL-p95/FALL-p50; si una clase está
/// vacía, ese feature cae a la partición genérica y se sigue adelante.
pub fn calibrate(
    samples: &[Sample],
    cfg: &CalibrationConfig,
) -> Result<CalibrationOutcome, CalibrationError> {
    let (windowed, params) = match cfg.policy {
        PartitionPolicy::Quartile => {
            let windowed =
                compute_windows_for_class(samples, &cfg.window, ActivityLabel::Fall)?;
            let params = quartile_params(&windowed, cfg);
            (windowed, params)
        }
        PartitionPolicy::Threshold => {
            let windowed = compute_windows(samples, &cfg.window);
            let params = threshold_params(&windowed, cfg);
            (windowed, params)
        }
    };

    let report = render_report(&windowed, &params, cfg);
    Ok(CalibrationOutcome {
        params,
        windowed,
        report,
    })
}

fn quartile_params(windowed: &Windowed, cfg: &CalibrationConfig) -> FuzzyParameterSet {
    let mut features = BTreeMap::new();
    for name in FEATURE_NAMES {
        let values: Vec<f64> = windowed.windows.iter().map(|w| w.feature(name)).collect();
        let dist = FeatureDistribution::summarize(&values);
        let [lo, hi] = universe_for(name, cfg);
        let trimf = relabel(trimf_from_quartiles(&dist, lo, hi), labels_for(name));

        features.insert(
            name.to_string(),
            FeatureParams {
                universe: [lo, hi],
                labels: labels_for(name).iter().map(|s| s.to_string()).collect(),
                trimf,
                percentiles: if dist.is_missing() { None } else { Some(dist) },
                thresholds: None,
            },
        );
    }
    FuzzyParameterSet { features }
}

fn threshold_params(windowed: &Windowed, cfg: &CalibrationConfig) -> FuzzyParameterSet {
    let mut features = BTreeMap::new();
    for name in THRESHOLD_FEATURES {
        let class_values = |label: ActivityLabel| -> Vec<f64> {
            windowed
                .windows
                .iter()
                .filter(|w| w.label == label)
                .map(|w| w.feature(name))
                .collect()
        };
        let adl = class_values(ActivityLabel::Adl);
        let fall = class_values(ActivityLabel::Fall);
        let summary = ClassSummary::summarize(&adl, &fall);

        let [lo, hi] = universe_for(name, cfg);
        let (low_max, high_min) = threshold_anchors(name, summary.thr, hi);
        let trimf = relabel(
            trimf_around_threshold(&summary, low_max, high_min, lo, hi),
            labels_for(name),
        );

        let all: Vec<f64> = windowed.windows.iter().map(|w| w.feature(name)).collect();
        let dist = FeatureDistribution::summarize(&all);

        features.insert(
            name.to_string(),
            FeatureParams {
                universe: [lo, hi],
                labels: labels_for(name).iter().map(|s| s.to_string()).collect(),
                trimf,
                percentiles: if dist.is_missing() { None } else { Some(dist) },
                thresholds: Some(summary),
            },
        );
    }
    FuzzyParameterSet { features }
}

fn universe_for(name: &str, cfg: &CalibrationConfig) -> [f64; 2] {
    match name {
        "ax_pk" | "ay_pk" | "az_pk" | "impact_g" => [0.0, cfg.max_g],
        "gx_pk" | "gy_pk" | "gz_pk" | "omega_peak" => [0.0, cfg.max_dps],
        "tilt_delta" => [0.0, TILT_DELTA_HI],
        _ => [0.0, 1.0],
    }
}

/// Nombres lingüísticos por feature. `omega_peak` usa slow/medium/fast y
/// `tilt_delta` small/medium/large; la base de reglas del motor depende de
/// estos nombres, así que son parte del contrato del artefacto.
fn labels_for(name: &str) -> [&'static str; 3] {
    match name {
        "omega_peak" => ["slow", "medium", "fast"],
        "tilt_delta" => ["small", "medium", "large"],
        _ => ["low", "medium", "high"],
    }
}

/// Los constructores de particiones devuelven low/medium/high; aquí se
/// renombran al vocabulario del feature manteniendo el orden.
fn relabel(
    sets: BTreeMap<String, TriangularSet>,
    labels: [&'static str; 3],
) -> BTreeMap<String, TriangularSet> {
    let mut out = BTreeMap::new();
    for (from, to) in [("low", labels[0]), ("medium", labels[1]), ("high", labels[2])] {
        if let Some(&set) = sets.get(from) {
            out.insert(to.to_string(), set);
        }
    }
    out
}

/// Anclas por feature para la política de umbral, heredadas de la
/// caracterización original: 60%/40% del universo para las magnitudes,
/// 90°/15° para tilt_delta.
fn threshold_anchors(name: &str, thr: Option<f64>, hi: f64) -> (f64, f64) {
    let thr = thr.unwrap_or(f64::NAN);
    match name {
        "tilt_delta" => (90.0_f64.min(thr), thr.max(15.0)),
        _ => ((hi * 0.6).min(thr), thr.max(hi * 0.4)),
    }
}

fn render_report(
    windowed: &Windowed,
    params: &FuzzyParameterSet,
    cfg: &CalibrationConfig,
) -> String {
    let policy = match cfg.policy {
        PartitionPolicy::Quartile => "cuartiles (solo FALL)",
        PartitionPolicy::Threshold => "umbral (ADL vs FALL)",
    };

    let mut out = String::new();
    let _ = writeln!(out, "# Informe de calibración de caídas");
    let _ = writeln!(
        out,
        "Ventanas: {} | Muestreo ~ {:.2} Hz | Política: {}",
        windowed.windows.len(),
        windowed.fs,
        policy
    );
    let _ = writeln!(
        out,
        "Ventana: {} muestras | Salto: {} muestras\n",
        windowed.win_n, windowed.hop_n
    );

    let _ = writeln!(out, "## Percentiles");
    for (name, fp) in &params.features {
        if let Some(st) = &fp.percentiles {
            let _ = writeln!(
                out,
                "- {:12}: min={:.3} p25={:.3} p50={:.3} p75={:.3} p90={:.3} max={:.3}",
                name, st.min, st.p25, st.p50, st.p75, st.p90, st.max
            );
        }
        if let Some(thr) = &fp.thresholds {
            let fmt = |v: Option<f64>| match v {
                Some(v) => format!("{:.3}", v),
                None => "n/d".to_string(),
            };
            let _ = writeln!(
                out,
                "    ADL p50={} p95={} | FALL p50={} p95={} | thr≈{}",
                fmt(thr.adl_p50),
                fmt(thr.adl_p95),
                fmt(thr.fall_p50),
                fmt(thr.fall_p95),
                fmt(thr.thr)
            );
        }
    }

    let _ = writeln!(out, "\n## trimf sugeridos (a, b, c) por feature");
    for (name, fp) in &params.features {
        let _ = writeln!(out, "- {}:", name);
        for label in &fp.labels {
            if let Some(t) = fp.trimf.get(label) {
                let _ = writeln!(
                    out,
                    "    {:6}: [{:.4}, {:.4}, {:.4}]",
                    label, t.a, t.b, t.c
                );
            }
        }
    }

    let _ = writeln!(out, "\nNotas:");
    let _ = writeln!(
        out,
        "- Usar el JSON de parámetros como entrada del motor de inferencia; este informe es solo para inspección."
    );
    out
}

/// Persiste el artefacto JSON. Dos calibraciones con la misma entrada
/// escriben exactamente los mismos bytes.
pub fn write_params_json(
    path: impl AsRef<Path>,
    params: &FuzzyParameterSet,
) -> Result<(), CalibrationError> {
    let json = params.to_json()?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Escribe el informe de texto plano.
pub fn write_report(path: impl AsRef<Path>, report: &str) -> Result<(), CalibrationError> {
    std::fs::write(path, report)?;
    Ok(())
}

/// Vuelca las ventanas con sus features a un CSV, en orden de índice.
pub fn write_features_csv(
    path: impl AsRef<Path>,
    windowed: &Windowed,
) -> Result<(), CalibrationError> {
    let mut file = File::create(path)?;
    writeln!(
        file,
        "t_start,t_end,impact_g,omega_peak,tilt_mean,tilt_delta,label"
    )?;
    for w in &windowed.windows {
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            w.t_start,
            w.t_end,
            w.impact_g,
            w.omega_peak,
            w.tilt_mean,
            w.tilt_delta,
            w.label.as_str()
        )?;
    }
    Ok(())
}
