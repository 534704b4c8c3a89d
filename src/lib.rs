//! Detección de caídas con IMU en dos fases:
//!
//! 1. Calibración offline: ventanea una grabación etiquetada, resume cada
//!    feature con percentiles y deriva los parámetros de los conjuntos
//!    triangulares (artefacto JSON + informe).
//! 2. Inferencia online: motor difuso Mamdani sobre |a| y |ω| que produce un
//!    score de caída en [0, 1], y un cerrojo con histéresis que lo convierte
//!    en decisión binaria.
//!
//! La adquisición del sensor, el etiquetado en vivo y la visualización son
//! colaboradores externos: este crate solo consume secuencias de muestras y
//! produce artefactos, scores y decisiones.

pub mod calibration;
pub mod csv_loader;
pub mod fuzzy;
pub mod hysteresis;
pub mod label_buffer;
pub mod partition;
pub mod stats;
pub mod types;
pub mod windowing;

pub use fuzzy::{FuzzyEngine, FuzzyParameterSet, TriangularSet};
pub use hysteresis::HysteresisDecider;
pub use types::{ActivityLabel, Sample};
