use crate::core::forcefield::params::ParamLoadError;
use crate::core::utils::interpolation::Curve;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CurveRecord {
    r: f64,
    u: f64,
}

/// Reads a correction curve from a CSV file with `r` and `u` columns.
///
/// Rows must be ordered by strictly increasing `r`; the curve need not share the grid of the
/// potential it is later applied to.
pub fn read_curve_csv(path: &Path) -> Result<Curve, ParamLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(|e| ParamLoadError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

    let mut x = Vec::new();
    let mut y = Vec::new();
    for result in reader.deserialize::<CurveRecord>() {
        let record = result.map_err(|e| ParamLoadError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        x.push(record.r);
        y.push(record.u);
    }

    Curve::new(x, y).map_err(|e| ParamLoadError::Curve {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}
