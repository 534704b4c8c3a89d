use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::{ActivityLabel, Sample, DEFAULT_FS};

#[derive(Error, Debug)]
pub enum WindowingError {
    #[error("No hay muestras con etiqueta {0} en la grabación")]
    EmptyClass(ActivityLabel),
}

/// Configuración de ventaneo: tamaño y salto en segundos.
/// La frecuencia de muestreo se estima siempre del propio log.
#[derive(Debug, Clone, Copy)]
pub struct WindowConfig {
    /// Duración de la ventana (s) (default: 1.0)
    pub win_s: f64,
    /// Salto entre inicios de ventana (s) (default: 0.5)
    pub hop_s: f64,
    /// Frecuencia usada si no hay deltas positivos en los timestamps (default: 50 Hz)
    pub default_fs: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            win_s: 1.0,
            hop_s: 0.5,
            default_fs: DEFAULT_FS,
        }
    }
}

/// Features escalares de una ventana.
#[derive(Debug, Clone, Copy)]
pub struct WindowFeatures {
    pub t_start: f64,
    pub t_end: f64,
    /// Picos absolutos por eje
    pub ax_pk: f64,
    pub ay_pk: f64,
    pub az_pk: f64,
    pub gx_pk: f64,
    pub gy_pk: f64,
    pub gz_pk: f64,
    /// max |a| dentro de la ventana (norma euclídea por muestra)
    pub impact_g: f64,
    /// max |ω| dentro de la ventana
    pub omega_peak: f64,
    /// Inclinación media (grados)
    pub tilt_mean: f64,
    /// tilt(última muestra) − tilt(primera muestra)
    pub tilt_delta: f64,
    /// Etiqueta mayoritaria de la ventana
    pub label: ActivityLabel,
}

/// Nombres de los features escalares, en el orden del artefacto.
pub const FEATURE_NAMES: [&str; 9] = [
    "ax_pk",
    "ay_pk",
    "az_pk",
    "gx_pk",
    "gy_pk",
    "gz_pk",
    "impact_g",
    "omega_peak",
    "tilt_delta",
];

impl WindowFeatures {
    /// Acceso por nombre, para recorrer los features de forma declarativa.
    pub fn feature(&self, name: &str) -> f64 {
        match name {
            "ax_pk" => self.ax_pk,
            "ay_pk" => self.ay_pk,
            "az_pk" => self.az_pk,
            "gx_pk" => self.gx_pk,
            "gy_pk" => self.gy_pk,
            "gz_pk" => self.gz_pk,
            "impact_g" => self.impact_g,
            "omega_peak" => self.omega_peak,
            "tilt_mean" => self.tilt_mean,
            "tilt_delta" => self.tilt_delta,
            _ => f64::NAN,
        }
    }
}

/// Resultado del ventaneo: la frecuencia estimada y las ventanas en orden.
#[derive(Debug, Clone)]
pub struct Windowed {
    pub fs: f64,
    pub win_n: usize,
    pub hop_n: usize,
    pub windows: Vec<WindowFeatures>,
}

/// Estima la frecuencia de muestreo como 1 / mediana de los deltas positivos
/// entre timestamps consecutivos. Sin deltas positivos, devuelve `default_fs`.
pub fn estimate_fs(t: &[f64], default_fs: f64) -> f64 {
    let mut dts: Vec<f64> = t
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| *d > 0.0 && !d.is_nan())
        .collect();
    if dts.is_empty() {
        return default_fs;
    }
    dts.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = dts.len() / 2;
    let dt_med = if dts.len() % 2 == 1 {
        dts[mid]
    } else {
        0.5 * (dts[mid - 1] + dts[mid])
    };
    if dt_med > 0.0 {
        1.0 / dt_med
    } else {
        default_fs
    }
}

/// Ventanea la secuencia completa y calcula los features por ventana.
/// Las ventanas se emiten en orden de índice; la última ventana parcial se descarta.
pub fn compute_windows(samples: &[Sample], cfg: &WindowConfig) -> Windowed {
    let t: Vec<f64> = samples.iter().map(|s| s.t).collect();
    let fs = estimate_fs(&t, cfg.default_fs);
    let win_n = ((cfg.win_s * fs).round() as usize).max(1);
    let hop_n = ((cfg.hop_s * fs).round() as usize).max(1);

    let mut windows = Vec::new();
    let mut i = 0;
    while i + win_n <= samples.len() {
        windows.push(features_of(&samples[i..i + win_n]));
        i += hop_n;
    }

    Windowed {
        fs,
        win_n,
        hop_n,
        windows,
    }
}

/// Ventanea solo la subsecuencia de una clase (p. ej. únicamente FALL).
/// La frecuencia se estima sobre esa subsecuencia. Falla si la clase no
/// aparece en la grabación.
pub fn compute_windows_for_class(
    samples: &[Sample],
    cfg: &WindowConfig,
    label: ActivityLabel,
) -> Result<Windowed, WindowingError> {
    let subset: Vec<Sample> = samples.iter().copied().filter(|s| s.label == label).collect();
    if subset.is_empty() {
        return Err(WindowingError::EmptyClass(label));
    }
    Ok(compute_windows(&subset, cfg))
}

fn features_of(win: &[Sample]) -> WindowFeatures {
    // max empezando en NaN: f64::max ignora el NaN, así que los valores
    // ausentes no contaminan el pico y una ventana vacía de datos queda NaN.
    let peak = |get: fn(&Sample) -> f64| win.iter().map(get).fold(f64::NAN, f64::max);

    let tilts: Vec<f64> = win.iter().map(|s| s.tilt_deg()).collect();
    let valid_tilts: Vec<f64> = tilts.iter().copied().filter(|v| !v.is_nan()).collect();
    let tilt_mean = if valid_tilts.is_empty() {
        f64::NAN
    } else {
        valid_tilts.iter().sum::<f64>() / valid_tilts.len() as f64
    };

    WindowFeatures {
        t_start: win[0].t,
        t_end: win[win.len() - 1].t,
        ax_pk: peak(|s| s.ax.abs()),
        ay_pk: peak(|s| s.ay.abs()),
        az_pk: peak(|s| s.az.abs()),
        gx_pk: peak(|s| s.gx.abs()),
        gy_pk: peak(|s| s.gy.abs()),
        gz_pk: peak(|s| s.gz.abs()),
        impact_g: peak(|s| s.a_mag()),
        omega_peak: peak(|s| s.w_mag()),
        tilt_mean,
        tilt_delta: tilts[tilts.len() - 1] - tilts[0],
        label: majority_label(win),
    }
}

/// Etiqueta mayoritaria de la ventana. Si hay mezcla de etiquetas y una de
/// ellas es NONE, NONE se descarta. El desempate entre dos etiquetas con el
/// mismo conteo queda en orden de ordenación (ADL antes que FALL): es un
/// detalle definido por la implementación, no un criterio deliberado.
fn majority_label(win: &[Sample]) -> ActivityLabel {
    let mut counts: BTreeMap<ActivityLabel, usize> = BTreeMap::new();
    for s in win {
        *counts.entry(s.label).or_insert(0) += 1;
    }
    if counts.len() > 1 {
        counts.remove(&ActivityLabel::None);
    }

    let mut best = ActivityLabel::None;
    let mut best_count = 0;
    for (label, count) in counts {
        if count > best_count {
            best = label;
            best_count = count;
        }
    }
    best
}
