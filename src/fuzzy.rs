use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::{ClassSummary, FeatureDistribution};

/// Puntos de discretización del universo de salida para el centroide.
const DEFUZZ_STEPS: usize = 100;

/// Activación mínima agregada para considerar que alguna regla disparó.
const ACTIVATION_EPS: f64 = 1e-9;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("El artefacto no contiene el feature '{0}'")]
    MissingFeature(String),

    #[error("Término desconocido '{term}' en la variable '{variable}'")]
    UnknownTerm { variable: String, term: String },

    #[error("Ninguna regla disparó por encima del umbral de activación")]
    NoActivation,

    #[error("El centroide no es un número finito")]
    NonFinite,
}

/// Función de pertenencia triangular (a, b, c): 0 fuera de [a, c],
/// rampa lineal hasta 1 en b. Se serializa como `[a, b, c]` en el artefacto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct TriangularSet {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl TriangularSet {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Grado de pertenencia de `x`. En los vértices a y c vale 0, en b vale 1.
    pub fn membership(&self, x: f64) -> f64 {
        if x <= self.a || x >= self.c {
            0.0
        } else if x <= self.b {
            (x - self.a) / (self.b - self.a)
        } else {
            (self.c - x) / (self.c - self.b)
        }
    }
}

impl From<[f64; 3]> for TriangularSet {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<TriangularSet> for [f64; 3] {
    fn from(t: TriangularSet) -> Self {
        [t.a, t.b, t.c]
    }
}

/// Parámetros persistidos de un feature: universo, conjuntos triangulares
/// con nombre y el resumen estadístico del que se derivaron.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureParams {
    pub universe: [f64; 2],
    pub labels: Vec<String>,
    pub trimf: BTreeMap<String, TriangularSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentiles: Option<FeatureDistribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ClassSummary>,
}

/// Artefacto de calibración: el único contrato entre la fase offline y el
/// motor de inferencia. El orden de claves es determinista (BTreeMap), de
/// modo que dos calibraciones con la misma entrada producen JSON idéntico
/// byte a byte.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuzzyParameterSet {
    pub features: BTreeMap<String, FeatureParams>,
}

impl FuzzyParameterSet {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("No se pudo leer el artefacto {:?}", path))?;
        Self::from_json(&content)
            .with_context(|| format!("Artefacto {:?} con formato inválido", path))
    }

    /// Parámetros caracterizados a mano para el scorer, utilizables antes de
    /// cualquier calibración. Los conjuntos "high"/"fast" se extienden hasta
    /// el final del universo para no dejar zonas muertas.
    pub fn characterized() -> Self {
        let mut features = BTreeMap::new();

        let mut acc = BTreeMap::new();
        acc.insert("low".to_string(), TriangularSet::new(0.0, 0.4, 0.9));
        acc.insert("medium".to_string(), TriangularSet::new(0.7, 1.0, 1.6));
        acc.insert("high".to_string(), TriangularSet::new(1.2, 2.2, 3.5));
        features.insert(
            "impact_g".to_string(),
            FeatureParams {
                universe: [0.0, 3.5],
                labels: vec!["low".into(), "medium".into(), "high".into()],
                trimf: acc,
                percentiles: None,
                thresholds: None,
            },
        );

        let mut gyr = BTreeMap::new();
        gyr.insert("slow".to_string(), TriangularSet::new(0.0, 40.0, 90.0));
        gyr.insert("medium".to_string(), TriangularSet::new(60.0, 160.0, 260.0));
        gyr.insert("fast".to_string(), TriangularSet::new(180.0, 320.0, 600.0));
        features.insert(
            "omega_peak".to_string(),
            FeatureParams {
                universe: [0.0, 600.0],
                labels: vec!["slow".into(), "medium".into(), "fast".into()],
                trimf: gyr,
                percentiles: None,
                thresholds: None,
            },
        );

        Self { features }
    }
}

/// Variable lingüística: un universo acotado y sus conjuntos con nombre.
#[derive(Debug, Clone)]
pub struct FuzzyVariable {
    pub name: String,
    pub universe: [f64; 2],
    pub sets: BTreeMap<String, TriangularSet>,
}

impl FuzzyVariable {
    pub fn new(name: &str, lo: f64, hi: f64) -> Self {
        Self {
            name: name.to_string(),
            universe: [lo, hi],
            sets: BTreeMap::new(),
        }
    }

    pub fn with_set(mut self, term: &str, set: TriangularSet) -> Self {
        self.sets.insert(term.to_string(), set);
        self
    }

    fn from_params(name: &str, params: &FeatureParams) -> Self {
        Self {
            name: name.to_string(),
            universe: params.universe,
            sets: params.trimf.clone(),
        }
    }

    pub fn clamp(&self, x: f64) -> f64 {
        x.clamp(self.universe[0], self.universe[1])
    }

    fn membership(&self, term: &str, x: f64) -> Result<f64, InferenceError> {
        let set = self.sets.get(term).ok_or_else(|| InferenceError::UnknownTerm {
            variable: self.name.clone(),
            term: term.to_string(),
        })?;
        Ok(set.membership(x))
    }
}

/// Regla Mamdani: conjunción (mínimo) de un término de cada entrada,
/// consecuente sobre la variable de salida.
#[derive(Debug, Clone)]
pub struct FuzzyRule {
    pub accel: String,
    pub omega: String,
    pub output: String,
}

impl FuzzyRule {
    pub fn new(accel: &str, omega: &str, output: &str) -> Self {
        Self {
            accel: accel.to_string(),
            omega: omega.to_string(),
            output: output.to_string(),
        }
    }
}

/// Motor de inferencia Mamdani para el score de caída.
///
/// Evaluación: clamp de entradas → fuzzificación → fuerza de regla por
/// mínimo → implicación por recorte → agregación por máximo → centroide.
/// `score` nunca falla: cualquier problema interno se convierte en 0.0,
/// se cuenta y se reporta por stderr, porque para el consumidor de
/// seguridad un score bajo vale más que una excepción.
pub struct FuzzyEngine {
    accel: FuzzyVariable,
    omega: FuzzyVariable,
    output: FuzzyVariable,
    rules: Vec<FuzzyRule>,
    fallbacks: AtomicU64,
}

impl FuzzyEngine {
    /// Construye un motor a partir de tablas declarativas arbitrarias.
    pub fn new(
        accel: FuzzyVariable,
        omega: FuzzyVariable,
        output: FuzzyVariable,
        rules: Vec<FuzzyRule>,
    ) -> Self {
        Self {
            accel,
            omega,
            output,
            rules,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Construye el motor estándar desde un artefacto de calibración:
    /// entradas `impact_g` y `omega_peak`, salida y reglas por defecto.
    pub fn from_params(params: &FuzzyParameterSet) -> Result<Self, InferenceError> {
        let acc = params
            .features
            .get("impact_g")
            .ok_or_else(|| InferenceError::MissingFeature("impact_g".to_string()))?;
        let gyr = params
            .features
            .get("omega_peak")
            .ok_or_else(|| InferenceError::MissingFeature("omega_peak".to_string()))?;

        Ok(Self::new(
            FuzzyVariable::from_params("accel", acc),
            FuzzyVariable::from_params("omega", gyr),
            Self::default_output(),
            Self::default_rules(),
        ))
    }

    /// Partición de la variable de salida (score de caída en [0,1]).
    pub fn default_output() -> FuzzyVariable {
        FuzzyVariable::new("fall", 0.0, 1.0)
            .with_set("low", TriangularSet::new(0.0, 0.2, 0.5))
            .with_set("medium", TriangularSet::new(0.3, 0.5, 0.7))
            .with_set("high", TriangularSet::new(0.6, 0.85, 1.0))
    }

    /// Base de reglas fija. El orden no importa: cada regla dispara o no
    /// según sus propias entradas.
    pub fn default_rules() -> Vec<FuzzyRule> {
        vec![
            // Impacto alto + giro rápido → caída muy probable
            FuzzyRule::new("high", "fast", "high"),
            FuzzyRule::new("high", "medium", "medium"),
            // Impacto medio + giro rápido → posible caída (resbalón)
            FuzzyRule::new("medium", "fast", "medium"),
            // Resbalón: giro muy rápido con poco impacto no debe quedar en "low"
            FuzzyRule::new("low", "fast", "medium"),
            FuzzyRule::new("medium", "medium", "medium"),
            FuzzyRule::new("medium", "slow", "low"),
            FuzzyRule::new("low", "slow", "low"),
            // Golpe sin rotación (choque sin caída) → medio, no alto
            FuzzyRule::new("high", "slow", "medium"),
        ]
    }

    /// Score de caída en [0, 1] para las magnitudes instantáneas de
    /// aceleración (g) y giro (°/s). Entradas fuera del universo se
    /// recortan en silencio. Nunca lanza ni propaga un error.
    pub fn score(&self, accel_g: f64, omega_dps: f64) -> f64 {
        match self.try_score(accel_g, omega_dps) {
            Ok(score) => score,
            Err(e) => {
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                eprintln!(
                    "[FUZZY] acc={:.3}g giro={:.1}°/s -> score 0.0 ({})",
                    accel_g, omega_dps, e
                );
                0.0
            }
        }
    }

    /// Número de evaluaciones que degradaron al score seguro 0.0.
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    fn try_score(&self, accel_g: f64, omega_dps: f64) -> Result<f64, InferenceError> {
        let a = self.accel.clamp(accel_g);
        let w = self.omega.clamp(omega_dps);

        // Fuerza agregada por término de salida: máximo de las reglas que
        // apuntan a ese término.
        let mut strengths: BTreeMap<&str, f64> = BTreeMap::new();
        for rule in &self.rules {
            if !self.output.sets.contains_key(&rule.output) {
                return Err(InferenceError::UnknownTerm {
                    variable: self.output.name.clone(),
                    term: rule.output.clone(),
                });
            }
            let strength = self
                .accel
                .membership(&rule.accel, a)?
                .min(self.omega.membership(&rule.omega, w)?);
            let entry = strengths.entry(rule.output.as_str()).or_insert(0.0);
            if strength > *entry {
                *entry = strength;
            }
        }

        // Centroide de la forma agregada sobre una malla densa de la salida.
        let [lo, hi] = self.output.universe;
        let mut num = 0.0;
        let mut den = 0.0;
        for i in 0..=DEFUZZ_STEPS {
            let x = lo + (hi - lo) * i as f64 / DEFUZZ_STEPS as f64;
            let mut mu: f64 = 0.0;
            for (term, set) in &self.output.sets {
                if let Some(&strength) = strengths.get(term.as_str()) {
                    mu = mu.max(set.membership(x).min(strength));
                }
            }
            num += x * mu;
            den += mu;
        }

        if den <= ACTIVATION_EPS {
            return Err(InferenceError::NoActivation);
        }
        let score = num / den;
        if !score.is_finite() {
            return Err(InferenceError::NonFinite);
        }
        Ok(score.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_membership_at_vertices() {
        let t = TriangularSet::new(1.0, 2.0, 4.0);
        assert_eq!(t.membership(1.0), 0.0);
        assert_eq!(t.membership(2.0), 1.0);
        assert_eq!(t.membership(4.0), 0.0);
        assert_eq!(t.membership(0.5), 0.0);
        assert_eq!(t.membership(5.0), 0.0);
        assert!((t.membership(1.5) - 0.5).abs() < 1e-12);
        assert!((t.membership(3.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn triangular_set_serializes_as_array() {
        let t = TriangularSet::new(0.0, 0.4, 0.9);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "[0.0,0.4,0.9]");
        let back: TriangularSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn characterized_params_build_an_engine() {
        let params = FuzzyParameterSet::characterized();
        assert!(FuzzyEngine::from_params(&params).is_ok());
    }

    #[test]
    fn from_params_requires_both_inputs() {
        let mut params = FuzzyParameterSet::characterized();
        params.features.remove("omega_peak");
        assert!(matches!(
            FuzzyEngine::from_params(&params),
            Err(InferenceError::MissingFeature(_))
        ));
    }

    #[test]
    fn hard_impact_with_fast_rotation_scores_high() {
        let engine = FuzzyEngine::from_params(&FuzzyParameterSet::characterized()).unwrap();
        let score = engine.score(2.5, 400.0);
        assert!(score > 0.6, "score={}", score);
    }

    #[test]
    fn quiet_motion_scores_low() {
        let engine = FuzzyEngine::from_params(&FuzzyParameterSet::characterized()).unwrap();
        let score = engine.score(0.3, 20.0);
        assert!(score < 0.3, "score={}", score);
        assert!(score > 0.0);
    }

    #[test]
    fn score_is_monotone_in_impact_at_slow_rotation() {
        let engine = FuzzyEngine::from_params(&FuzzyParameterSet::characterized()).unwrap();
        // Giro fijo en el valor representativo de "slow" (pico del conjunto)
        let mut prev = engine.score(0.0, 40.0);
        let mut x = 0.05;
        while x <= 3.45 {
            let s = engine.score(x, 40.0);
            assert!(
                s >= prev - 0.02,
                "score bajó de {} a {} en acc={}",
                prev,
                s,
                x
            );
            prev = s;
            x += 0.05;
        }
    }

    #[test]
    fn inputs_are_clamped_to_the_universe() {
        // Motor sintético cuyo conjunto "low" cubre el borde inferior del
        // universo, para que el recorte sea observable en el score.
        let accel = FuzzyVariable::new("accel", 0.0, 10.0)
            .with_set("low", TriangularSet::new(-5.0, 0.0, 5.0))
            .with_set("high", TriangularSet::new(5.0, 10.0, 15.0));
        let omega = FuzzyVariable::new("omega", 0.0, 10.0)
            .with_set("slow", TriangularSet::new(-5.0, 0.0, 5.0))
            .with_set("fast", TriangularSet::new(5.0, 10.0, 15.0));
        let rules = vec![
            FuzzyRule::new("low", "slow", "low"),
            FuzzyRule::new("high", "fast", "high"),
        ];
        let engine = FuzzyEngine::new(accel, omega, FuzzyEngine::default_output(), rules);

        let clamped = engine.score(-3.0, -100.0);
        let at_bound = engine.score(0.0, 0.0);
        assert!((clamped - at_bound).abs() < 1e-12);
        assert!(at_bound > 0.0);
    }

    #[test]
    fn symmetric_activation_centers_the_centroid() {
        let accel = FuzzyVariable::new("accel", 0.0, 1.0)
            .with_set("only", TriangularSet::new(-1.0, 0.0, 1.0));
        let omega = FuzzyVariable::new("omega", 0.0, 1.0)
            .with_set("only", TriangularSet::new(-1.0, 0.0, 1.0));
        let output = FuzzyVariable::new("out", 0.0, 1.0)
            .with_set("mid", TriangularSet::new(0.0, 0.5, 1.0));
        let rules = vec![FuzzyRule::new("only", "only", "mid")];
        let engine = FuzzyEngine::new(accel, omega, output, rules);

        // La regla dispara con fuerza 1 y el conjunto de salida es simétrico
        let score = engine.score(0.0, 0.0);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn no_activation_falls_back_to_zero_and_is_counted() {
        let engine = FuzzyEngine::from_params(&FuzzyParameterSet::characterized()).unwrap();
        // En el origen ningún conjunto tiene pertenencia (vértice a)
        assert_eq!(engine.score(0.0, 0.0), 0.0);
        assert_eq!(engine.fallback_count(), 1);
    }

    #[test]
    fn unknown_rule_term_degrades_to_zero_instead_of_failing() {
        let accel = FuzzyVariable::new("accel", 0.0, 1.0)
            .with_set("low", TriangularSet::new(-1.0, 0.0, 1.0));
        let omega = FuzzyVariable::new("omega", 0.0, 1.0)
            .with_set("slow", TriangularSet::new(-1.0, 0.0, 1.0));
        let rules = vec![FuzzyRule::new("low", "inexistente", "low")];
        let engine = FuzzyEngine::new(accel, omega, FuzzyEngine::default_output(), rules);

        assert_eq!(engine.score(0.5, 0.5), 0.0);
        assert_eq!(engine.fallback_count(), 1);
    }

    #[test]
    fn parameter_set_roundtrips_through_json() {
        let params = FuzzyParameterSet::characterized();
        let json = params.to_json().unwrap();
        let back = FuzzyParameterSet::from_json(&json).unwrap();
        assert_eq!(back.features.len(), params.features.len());
        assert_eq!(
            back.features["impact_g"].trimf["high"],
            params.features["impact_g"].trimf["high"]
        );
    }
}
