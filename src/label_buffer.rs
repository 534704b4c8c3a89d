use std::collections::VecDeque;

use crate::types::{ActivityLabel, Sample};

/// Cuándo se re-etiquetan hacia atrás las muestras retenidas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetroMode {
    /// Nunca
    Off,
    /// Solo al pasar a FALL (compensa el retardo humano al pulsar la tecla)
    FallOnly,
    /// En cualquier cambio de etiqueta
    All,
}

/// Fila etiquetada pendiente de volcado a disco.
#[derive(Debug, Clone, Copy)]
pub struct LabeledRow {
    pub sample: Sample,
    pub event_id: u32,
}

/// Buffer circular acotado para re-etiquetado retroactivo.
///
/// Retiene las últimas N muestras antes de entregarlas al escritor, de modo
/// que un cambio de etiqueta pueda reescribir lo aún no volcado. Regla de
/// propiedad: solo el escritor actual (quien tiene el `&mut`) puede reescribir
/// entradas retenidas; el volcado es estrictamente FIFO, tanto por desborde
/// como en el drenado final.
#[derive(Debug)]
pub struct RetroLabelBuffer {
    buf: VecDeque<LabeledRow>,
    cap: usize,
    mode: RetroMode,
    current_label: ActivityLabel,
    event_id: u32,
}

impl RetroLabelBuffer {
    /// `cap` es el número de muestras retenidas (0 desactiva la retención y
    /// cada push sale directo al escritor).
    pub fn new(cap: usize, mode: RetroMode) -> Self {
        Self {
            buf: VecDeque::with_capacity(cap),
            cap,
            mode,
            current_label: ActivityLabel::None,
            event_id: 0,
        }
    }

    /// Cambia la etiqueta vigente. Pasar a FALL abre un nuevo evento.
    /// Según el modo, reescribe la etiqueta y el evento de todas las
    /// entradas aún retenidas.
    pub fn set_label(&mut self, label: ActivityLabel) {
        if label == self.current_label {
            return;
        }
        if label == ActivityLabel::Fall {
            self.event_id += 1;
        }

        let retro = match self.mode {
            RetroMode::Off => false,
            RetroMode::FallOnly => label == ActivityLabel::Fall,
            RetroMode::All => true,
        };
        if retro {
            let n = self.buf.len().min(self.cap);
            let start = self.buf.len() - n;
            for row in self.buf.iter_mut().skip(start) {
                row.sample.label = label;
                row.event_id = self.event_id;
            }
        }

        self.current_label = label;
    }

    /// Encola una muestra con la etiqueta vigente. Si el buffer desborda,
    /// devuelve la fila más antigua, ya definitiva, para que el escritor la
    /// persista.
    pub fn push(&mut self, mut sample: Sample) -> Option<LabeledRow> {
        sample.label = self.current_label;
        let row = LabeledRow {
            sample,
            event_id: self.event_id,
        };

        if self.cap == 0 {
            return Some(row);
        }

        self.buf.push_back(row);
        if self.buf.len() > self.cap {
            self.buf.pop_front()
        } else {
            None
        }
    }

    /// Vacía el buffer en orden FIFO (p. ej. al cerrar el log).
    pub fn drain(&mut self) -> impl Iterator<Item = LabeledRow> + '_ {
        self.buf.drain(..)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn current_label(&self) -> ActivityLabel {
        self.current_label
    }

    pub fn event_id(&self) -> u32 {
        self.event_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64) -> Sample {
        Sample {
            t,
            ax: 0.0,
            ay: 0.0,
            az: 1.0,
            gx: 0.0,
            gy: 0.0,
            gz: 0.0,
            label: ActivityLabel::None,
        }
    }

    #[test]
    fn flush_is_strictly_fifo() {
        let mut buf = RetroLabelBuffer::new(3, RetroMode::FallOnly);
        let mut flushed = Vec::new();
        for i in 0..6 {
            if let Some(row) = buf.push(sample(i as f64)) {
                flushed.push(row.sample.t);
            }
        }
        assert_eq!(flushed, vec![0.0, 1.0, 2.0]);
        let rest: Vec<f64> = buf.drain().map(|r| r.sample.t).collect();
        assert_eq!(rest, vec![3.0, 4.0, 5.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn fall_transition_relabels_retained_rows() {
        let mut buf = RetroLabelBuffer::new(5, RetroMode::FallOnly);
        buf.set_label(ActivityLabel::Adl);
        for i in 0..4 {
            assert!(buf.push(sample(i as f64)).is_none());
        }

        buf.set_label(ActivityLabel::Fall);
        let rows: Vec<LabeledRow> = buf.drain().collect();
        assert!(rows.iter().all(|r| r.sample.label == ActivityLabel::Fall));
        assert!(rows.iter().all(|r| r.event_id == 1));
    }

    #[test]
    fn flushed_rows_are_beyond_reach() {
        let mut buf = RetroLabelBuffer::new(2, RetroMode::FallOnly);
        buf.set_label(ActivityLabel::Adl);
        let mut flushed = Vec::new();
        for i in 0..4 {
            if let Some(row) = buf.push(sample(i as f64)) {
                flushed.push(row);
            }
        }
        // Las dos primeras ya salieron con ADL; el cambio a FALL no las toca
        buf.set_label(ActivityLabel::Fall);
        assert!(flushed.iter().all(|r| r.sample.label == ActivityLabel::Adl));
        assert!(buf.drain().all(|r| r.sample.label == ActivityLabel::Fall));
    }

    #[test]
    fn mode_off_never_rewrites() {
        let mut buf = RetroLabelBuffer::new(5, RetroMode::Off);
        buf.set_label(ActivityLabel::Adl);
        buf.push(sample(0.0));
        buf.set_label(ActivityLabel::Fall);
        let rows: Vec<LabeledRow> = buf.drain().collect();
        assert_eq!(rows[0].sample.label, ActivityLabel::Adl);
        // El evento sí avanza aunque no se reescriba
        assert_eq!(buf.event_id(), 1);
    }

    #[test]
    fn mode_all_rewrites_on_any_change() {
        let mut buf = RetroLabelBuffer::new(5, RetroMode::All);
        buf.set_label(ActivityLabel::Fall);
        buf.push(sample(0.0));
        buf.set_label(ActivityLabel::Adl);
        let rows: Vec<LabeledRow> = buf.drain().collect();
        assert_eq!(rows[0].sample.label, ActivityLabel::Adl);
    }

    #[test]
    fn each_fall_opens_a_new_event() {
        let mut buf = RetroLabelBuffer::new(2, RetroMode::FallOnly);
        buf.set_label(ActivityLabel::Fall);
        assert_eq!(buf.event_id(), 1);
        buf.set_label(ActivityLabel::None);
        buf.set_label(ActivityLabel::Fall);
        assert_eq!(buf.event_id(), 2);
        // Repetir la misma etiqueta no abre evento
        buf.set_label(ActivityLabel::Fall);
        assert_eq!(buf.event_id(), 2);
    }

    #[test]
    fn zero_capacity_passes_rows_through() {
        let mut buf = RetroLabelBuffer::new(0, RetroMode::FallOnly);
        buf.set_label(ActivityLabel::Adl);
        let row = buf.push(sample(0.0));
        assert!(row.is_some());
        assert_eq!(row.unwrap().sample.label, ActivityLabel::Adl);
        assert!(buf.is_empty());
    }
}
