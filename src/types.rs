use serde::{Deserialize, Serialize};

/// Etiqueta de actividad asignada por el operador durante la grabación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityLabel {
    /// Actividad de la vida diaria (caminar, sentarse, etc.)
    Adl,
    /// Caída etiquetada
    Fall,
    /// Sin etiqueta
    None,
}

impl ActivityLabel {
    /// Parsea la etiqueta tal como aparece en el log (`ADL`, `FALL`, `NONE`).
    /// Cualquier valor desconocido se trata como `None`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADL" => ActivityLabel::Adl,
            "FALL" => ActivityLabel::Fall,
            _ => ActivityLabel::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLabel::Adl => "ADL",
            ActivityLabel::Fall => "FALL",
            ActivityLabel::None => "NONE",
        }
    }
}

impl std::fmt::Display for ActivityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Una muestra IMU de 6 ejes con timestamp y etiqueta.
/// Aceleraciones en g, velocidades angulares en °/s.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub t: f64,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
    pub label: ActivityLabel,
}

impl Sample {
    /// Magnitud euclídea de la aceleración (|a| en g).
    pub fn a_mag(&self) -> f64 {
        (self.ax * self.ax + self.ay * self.ay + self.az * self.az).sqrt()
    }

    /// Magnitud euclídea de la velocidad angular (|ω| en °/s).
    pub fn w_mag(&self) -> f64 {
        (self.gx * self.gx + self.gy * self.gy + self.gz * self.gz).sqrt()
    }

    /// Inclinación del tronco respecto al eje de gravedad, en grados.
    /// 0° = vertical, ~90° = horizontal. Solo usa el acelerómetro.
    pub fn tilt_deg(&self) -> f64 {
        tilt_deg(self.ax, self.ay, self.az)
    }
}

/// Inclinación en grados a partir de las tres aceleraciones, recortada a [0, 180].
pub fn tilt_deg(ax: f64, ay: f64, az: f64) -> f64 {
    let horiz = (ax * ax + ay * ay).sqrt();
    let ang = horiz.atan2(az.abs() + 1e-9).to_degrees();
    ang.clamp(0.0, 180.0)
}

/// Frecuencia de muestreo por defecto cuando no se puede estimar del log.
pub const DEFAULT_FS: f64 = 50.0;

/// Cota superior por defecto del universo de aceleración (g).
pub const DEFAULT_MAX_G: f64 = 3.0;

/// Cota superior por defecto del universo de giro (°/s).
pub const DEFAULT_MAX_DPS: f64 = 400.0;

/// Universo de tilt_delta (grados).
pub const TILT_DELTA_HI: f64 = 120.0;
