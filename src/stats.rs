use serde::{Deserialize, Serialize};

/// Percentil simple (0..100) con interpolación lineal entre rangos vecinos.
/// Los NaN (valores ausentes) se excluyen antes de ordenar. Si no queda
/// ningún valor, devuelve NaN.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    let mut vs: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if vs.is_empty() {
        return f64::NAN;
    }
    vs.sort_by(|a, b| a.partial_cmp(b).unwrap());

    if p <= 0.0 {
        return vs[0];
    }
    if p >= 100.0 {
        return vs[vs.len() - 1];
    }

    let k = (vs.len() - 1) as f64 * (p / 100.0);
    let f = k.floor();
    let c = k.ceil();
    if (f - c).abs() < f64::EPSILON {
        return vs[k as usize];
    }
    let d0 = vs[f as usize] * (c - k);
    let d1 = vs[c as usize] * (k - f);
    d0 + d1
}

/// Resumen de la distribución de un feature sobre todas las ventanas
/// (o sobre las ventanas de una clase). Forma parte del artefacto persistido.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureDistribution {
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl FeatureDistribution {
    /// Calcula el resumen sobre los valores no ausentes. Con entrada vacía
    /// (o todo NaN) cada estadístico es NaN; quien construya particiones a
    /// partir de esto debe sustituir por los límites del universo, nunca
    /// propagar el centinela a una regla.
    pub fn summarize(values: &[f64]) -> Self {
        Self {
            min: percentile(values, 0.0),
            max: percentile(values, 100.0),
            p10: percentile(values, 10.0),
            p25: percentile(values, 25.0),
            p50: percentile(values, 50.0),
            p75: percentile(values, 75.0),
            p90: percentile(values, 90.0),
        }
    }

    /// true si el resumen proviene de una entrada vacía.
    pub fn is_missing(&self) -> bool {
        self.min.is_nan()
    }
}

/// Percentiles clave por clase (ADL vs FALL) de un feature, más el umbral de
/// decisión sugerido. Se conserva en el artefacto junto a los trimf, como
/// estadística cruda de respaldo. `None` significa que la clase no aportó
/// ningún valor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassSummary {
    pub adl_p50: Option<f64>,
    pub adl_p95: Option<f64>,
    pub fall_p50: Option<f64>,
    pub fall_p95: Option<f64>,
    /// Punto medio entre ADL p95 y FALL p50; indefinido si falta una clase.
    pub thr: Option<f64>,
}

impl ClassSummary {
    pub fn summarize(adl: &[f64], fall: &[f64]) -> Self {
        let stat = |values: &[f64], p: f64| {
            let v = percentile(values, p);
            if v.is_nan() {
                None
            } else {
                Some(v)
            }
        };

        let adl_p95 = stat(adl, 95.0);
        let fall_p50 = stat(fall, 50.0);
        let thr = match (adl_p95, fall_p50) {
            (Some(a), Some(f)) => Some((a + f) / 2.0),
            _ => None,
        };

        Self {
            adl_p50: stat(adl, 50.0),
            adl_p95,
            fall_p50,
            fall_p95: stat(fall, 95.0),
            thr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_endpoints_are_min_and_max() {
        let v = vec![7.0, 1.0, 4.0, 9.0, 2.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, -5.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 9.0);
        assert_eq!(percentile(&v, 150.0), 9.0);
    }

    #[test]
    fn percentile_50_matches_median_odd_and_even() {
        let odd = vec![3.0, 1.0, 2.0];
        assert_eq!(percentile(&odd, 50.0), 2.0);

        let even = vec![4.0, 1.0, 3.0, 2.0];
        assert!((percentile(&even, 50.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn percentile_interpolates_between_ranks() {
        // n=5, p=30 -> k=1.2 -> 0.8*v[1] + 0.2*v[2]
        let v = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        assert!((percentile(&v, 30.0) - 22.0).abs() < 1e-12);
    }

    #[test]
    fn nan_values_are_excluded() {
        let v = vec![f64::NAN, 2.0, f64::NAN, 4.0];
        assert_eq!(percentile(&v, 0.0), 2.0);
        assert_eq!(percentile(&v, 100.0), 4.0);
        assert!((percentile(&v, 50.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input_yields_missing_summary() {
        assert!(percentile(&[], 50.0).is_nan());
        let d = FeatureDistribution::summarize(&[f64::NAN, f64::NAN]);
        assert!(d.is_missing());
        assert!(d.p50.is_nan());
    }

    #[test]
    fn class_summary_midpoint_threshold() {
        let adl: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect(); // p95 ≈ 0.9405
        let fall: Vec<f64> = (0..100).map(|i| 2.0 + i as f64 / 100.0).collect(); // p50 ≈ 2.495
        let s = ClassSummary::summarize(&adl, &fall);
        let thr = s.thr.unwrap();
        let expected = (percentile(&adl, 95.0) + percentile(&fall, 50.0)) / 2.0;
        assert!((thr - expected).abs() < 1e-12);
    }

    #[test]
    fn class_summary_without_a_class_has_no_threshold() {
        let fall = vec![2.0, 2.5, 3.0];
        let s = ClassSummary::summarize(&[], &fall);
        assert!(s.adl_p50.is_none());
        assert!(s.adl_p95.is_none());
        assert!(s.fall_p50.is_some());
        assert!(s.thr.is_none());
    }

    #[test]
    fn summary_is_ordered() {
        let v: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let d = FeatureDistribution::summarize(&v);
        assert!(d.min <= d.p10 && d.p10 <= d.p25 && d.p25 <= d.p50);
        assert!(d.p50 <= d.p75 && d.p75 <= d.p90 && d.p90 <= d.max);
    }
}
