use std::collections::BTreeMap;

use crate::fuzzy::TriangularSet;
use crate::stats::{ClassSummary, FeatureDistribution};

/// Separación mínima al reparar un triángulo degenerado.
const REPAIR_EPS: f64 = 1e-6;

/// Política de derivación de particiones difusas. Las dos variantes de una
/// misma capacidad: elegir una u otra no cambia la forma del artefacto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionPolicy {
    /// Cuartiles de una sola clase (solo ventanas FALL)
    Quartile,
    /// Umbral ADL-p95 / FALL-p50 sobre las dos clases
    Threshold,
}

impl PartitionPolicy {
    /// Valores aceptados en la línea de comandos.
    pub fn from_arg(s: &str) -> Option<Self> {
        match s {
            "cuartiles" | "quartile" => Some(PartitionPolicy::Quartile),
            "umbral" | "threshold" => Some(PartitionPolicy::Threshold),
            _ => None,
        }
    }
}

/// Tres conjuntos triangulares a partir de los cuartiles de la clase FALL:
///   low    ~ [min, p25, p50]
///   medium ~ [p25, p50, p75]
///   high   ~ [p50, p75, max]
/// Cada triple se recorta al universo y se repara si queda degenerado.
/// Estadísticos ausentes (NaN) se sustituyen por los límites del universo o
/// su punto medio; el centinela nunca llega a un conjunto.
pub fn trimf_from_quartiles(
    stats: &FeatureDistribution,
    lo: f64,
    hi: f64,
) -> BTreeMap<String, TriangularSet> {
    let sub = |v: f64, default: f64| if v.is_nan() { default } else { v };

    let mn = sub(stats.min, lo);
    let mx = sub(stats.max, hi);
    let p25 = sub(stats.p25, lo);
    let p50 = sub(stats.p50, (lo + hi) / 2.0);
    let p75 = sub(stats.p75, hi);

    let tri = |a: f64, b: f64, c: f64| {
        let a = a.clamp(lo, hi);
        let mut b = b.clamp(lo, hi);
        let mut c = c.clamp(lo, hi);
        if b <= a {
            b = (a + REPAIR_EPS).min(hi);
        }
        if c <= b {
            c = (b + REPAIR_EPS).min(hi);
        }
        TriangularSet::new(a, b, c)
    };

    let mut sets = BTreeMap::new();
    sets.insert("low".to_string(), tri(mn, p25, p50));
    sets.insert("medium".to_string(), tri(p25, p50, p75));
    sets.insert("high".to_string(), tri(p50, p75, mx));
    sets
}

/// Tres conjuntos anclados en el umbral de decisión entre clases:
///   low    sube cerca del inicio del universo y cae hasta thr
///   medium centrado en thr, con solape del 30% hacia cada vecino
///   high   arranca en thr y culmina cerca del final del universo
/// `low_max` y `high_min` son anclas por feature (ver la calibración).
/// Sin umbral (una clase vacía), partición genérica en quintos.
pub fn trimf_around_threshold(
    summary: &ClassSummary,
    low_max: f64,
    high_min: f64,
    lo: f64,
    hi: f64,
) -> BTreeMap<String, TriangularSet> {
    let thr = match summary.thr {
        Some(thr) => thr,
        None => return generic_partition(lo, hi),
    };

    let low = [lo, lo.max((lo + low_max) / 2.0), lo.max(thr.min(low_max))];
    let mid = [
        lo.max(thr - (thr - lo) * 0.3),
        thr,
        hi.min(thr + (hi - thr) * 0.3),
    ];
    let high = [hi.min(thr.max(high_min)), hi.min((high_min + hi) / 2.0), hi];

    let mut sets = BTreeMap::new();
    sets.insert("low".to_string(), sort_tri(low, hi));
    sets.insert("medium".to_string(), sort_tri(mid, hi));
    sets.insert("high".to_string(), sort_tri(high, hi));
    sets
}

/// Partición fija en quintos del universo (0–40%, 20–80%, 60–100%), para que
/// el sistema siga siendo usable con datos de calibración incompletos.
pub fn generic_partition(lo: f64, hi: f64) -> BTreeMap<String, TriangularSet> {
    let span = hi - lo;
    let mut sets = BTreeMap::new();
    sets.insert(
        "low".to_string(),
        sort_tri([lo, lo, lo + span * 0.4], hi),
    );
    sets.insert(
        "medium".to_string(),
        sort_tri([lo + span * 0.2, lo + span * 0.5, lo + span * 0.8], hi),
    );
    sets.insert(
        "high".to_string(),
        sort_tri([lo + span * 0.6, hi, hi], hi),
    );
    sets
}

/// Ordena el triple y separa duplicados con un épsilon, sin salirse del
/// universo por arriba.
fn sort_tri(mut x: [f64; 3], hi: f64) -> TriangularSet {
    x.sort_by(|a, b| a.partial_cmp(b).unwrap());
    if x[0] == x[1] {
        x[1] = (x[1] + REPAIR_EPS).min(hi);
    }
    if x[1] == x[2] {
        x[2] = (x[2] + REPAIR_EPS).min(hi);
    }
    TriangularSet::new(x[0], x[1], x[2])
}
