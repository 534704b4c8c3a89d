use std::collections::HashMap;
use std::path::Path;

use csv::ReaderBuilder;
use thiserror::Error;

use crate::types::{ActivityLabel, Sample};

/// Columnas que la tabla de calibración debe traer sí o sí.
const REQUIRED_COLUMNS: [&str; 8] = ["t", "ax", "ay", "az", "gx", "gy", "gz", "label"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Falta la columna obligatoria '{column}' en {path}")]
    MissingColumn { column: String, path: String },

    #[error("Error CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Carga una grabación etiquetada desde una tabla de texto delimitada
/// (el `.txt` del logger). La cabecera se resuelve por nombre, así que el
/// orden de columnas da igual y las columnas extra (`a_mag`, `w_mag`,
/// `event_id`, ...) se ignoran: las magnitudes se recalculan de los ejes.
///
/// Los campos numéricos ilegibles quedan como NaN (el centinela de valor
/// ausente) y se excluyen de las estadísticas aguas abajo. Las filas más
/// cortas que la cabecera se descartan.
pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<Sample>, LoaderError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let name_to_idx: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim(), idx))
        .collect();

    for column in REQUIRED_COLUMNS {
        if !name_to_idx.contains_key(column) {
            return Err(LoaderError::MissingColumn {
                column: column.to_string(),
                path: format!("{:?}", path),
            });
        }
    }

    let idx = |name: &str| name_to_idx[name];
    let (i_t, i_ax, i_ay, i_az) = (idx("t"), idx("ax"), idx("ay"), idx("az"));
    let (i_gx, i_gy, i_gz, i_label) = (idx("gx"), idx("gy"), idx("gz"), idx("label"));
    let header_len = headers.len();

    let mut samples = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.is_empty() || record.len() < header_len {
            continue;
        }

        samples.push(Sample {
            t: safe_float(record.get(i_t)),
            ax: safe_float(record.get(i_ax)),
            ay: safe_float(record.get(i_ay)),
            az: safe_float(record.get(i_az)),
            gx: safe_float(record.get(i_gx)),
            gy: safe_float(record.get(i_gy)),
            gz: safe_float(record.get(i_gz)),
            label: ActivityLabel::parse(record.get(i_label).unwrap_or("")),
        });
    }

    Ok(samples)
}

fn safe_float(field: Option<&str>) -> f64 {
    field
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn write_tmp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("caidoscopio_{}_{}", std::process::id(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn loads_labeled_rows() {
        let path = write_tmp(
            "ok.txt",
            "t,ax,ay,az,gx,gy,gz,a_mag,w_mag,label,event_id,label_change\n\
             0.00,0.01,-0.02,1.00,1.5,-2.0,0.5,1.0,2.6,NONE,0,\n\
             0.02,0.50,0.10,0.80,120.0,30.0,-10.0,0.95,124.1,FALL,1,NONE->FALL\n",
        );
        let samples = load_samples(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, ActivityLabel::None);
        assert_eq!(samples[1].label, ActivityLabel::Fall);
        assert!((samples[1].gx - 120.0).abs() < 1e-12);
        assert!((samples[1].t - 0.02).abs() < 1e-12);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let path = write_tmp("sin_label.txt", "t,ax,ay,az,gx,gy,gz\n0.0,0,0,1,0,0,0\n");
        let err = load_samples(&path).unwrap_err();
        fs::remove_file(&path).ok();

        match err {
            LoaderError::MissingColumn { column, .. } => assert_eq!(column, "label"),
            other => panic!("error inesperado: {other}"),
        }
    }

    #[test]
    fn unparseable_numbers_become_nan() {
        let path = write_tmp(
            "nan.txt",
            "t,ax,ay,az,gx,gy,gz,label\n0.0,oops,0.1,1.0,0,0,0,ADL\n",
        );
        let samples = load_samples(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(samples.len(), 1);
        assert!(samples[0].ax.is_nan());
        assert!(!samples[0].ay.is_nan());
    }

    #[test]
    fn short_rows_are_skipped() {
        let path = write_tmp(
            "corta.txt",
            "t,ax,ay,az,gx,gy,gz,label\n0.0,0,0,1,0,0,0,ADL\n0.02,0,0\n0.04,0,0,1,0,0,0,FALL\n",
        );
        let samples = load_samples(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].label, ActivityLabel::Fall);
    }

    #[test]
    fn column_order_does_not_matter() {
        let path = write_tmp(
            "orden.txt",
            "label,t,gz,gy,gx,az,ay,ax\nFALL,1.5,3.0,2.0,1.0,0.9,0.2,0.1\n",
        );
        let samples = load_samples(&path).unwrap();
        fs::remove_file(&path).ok();

        let s = &samples[0];
        assert_eq!(s.label, ActivityLabel::Fall);
        assert!((s.t - 1.5).abs() < 1e-12);
        assert!((s.ax - 0.1).abs() < 1e-12);
        assert!((s.gz - 3.0).abs() < 1e-12);
    }
}
