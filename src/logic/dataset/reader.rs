//! CSV → feature matrix

use std::path::Path;

use csv::ReaderBuilder;
use ndarray::Array2;

use super::DatasetError;

/// Read a numeric CSV with a header row.
///
/// Empty fields become NaN (zeroed later by normalization).
/// At most `row_limit` data rows are read when set.
pub fn read_matrix(path: &Path, row_limit: Option<usize>) -> Result<Array2<f64>, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::MissingFile(path.to_path_buf()));
    }

    let csv_err = |source| DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_err)?;

    let width = reader.headers().map_err(csv_err)?.len();
    let mut values = Vec::new();
    let mut rows = 0usize;

    for record in reader.records() {
        if row_limit.is_some_and(|limit| rows >= limit) {
            break;
        }

        let record = record.map_err(csv_err)?;
        for (column, field) in record.iter().enumerate() {
            let value = parse_field(field).ok_or_else(|| DatasetError::Parse {
                path: path.to_path_buf(),
                row: rows,
                column,
                value: field.to_string(),
            })?;
            values.push(value);
        }
        rows += 1;
    }

    let actual = if rows > 0 { values.len() / rows } else { width };
    Array2::from_shape_vec((rows, width), values).map_err(|_| DatasetError::WidthMismatch {
        path: path.to_path_buf(),
        expected: width,
        actual,
    })
}

fn parse_field(field: &str) -> Option<f64> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return Some(f64::NAN);
    }
    trimmed.parse().ok()
}
