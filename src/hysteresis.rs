use std::collections::VecDeque;

/// Muestras de score que se conservan para inspección (~0.5 s a 50 Hz).
const HISTORY_LEN: usize = 25;

/// Cerrojo de decisión con histéresis de dos umbrales.
///
/// Inactivo → Activo cuando el último score ≥ `hi`; Activo se mantiene
/// mientras el score ≥ `lo` y cae a Inactivo por debajo. La evaluación es
/// causal: solo el score actual y los pasados influyen en la decisión.
///
/// Está separado del motor difuso a propósito: una política alternativa
/// (votación por mayoría, debounce) puede sustituir esta capa sin tocar la
/// inferencia. Una instancia por stream de sensor; no se comparte.
#[derive(Debug)]
pub struct HysteresisDecider {
    hi: f64,
    lo: f64,
    active: bool,
    recent: VecDeque<f64>,
}

impl HysteresisDecider {
    /// Crea el cerrojo en estado Inactivo. Requiere `hi > lo`.
    pub fn new(hi: f64, lo: f64) -> Self {
        debug_assert!(hi > lo, "hysteresis requiere hi > lo");
        Self {
            hi,
            lo,
            active: false,
            recent: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Procesa el siguiente score y devuelve la decisión actual.
    pub fn update(&mut self, score: f64) -> bool {
        self.recent.push_back(score);
        if self.recent.len() > HISTORY_LEN {
            self.recent.pop_front();
        }

        self.active = if self.active {
            score >= self.lo
        } else {
            score >= self.hi
        };
        self.active
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Últimos scores procesados, del más antiguo al más reciente.
    pub fn recent_scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.recent.iter().copied()
    }

    /// Vuelve al estado inicial (Inactivo, sin historial).
    pub fn reset(&mut self) {
        self.active = false;
        self.recent.clear();
    }
}

impl Default for HysteresisDecider {
    fn default() -> Self {
        Self::new(0.7, 0.5)
    }
}
