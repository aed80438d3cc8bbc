//! Dataset Module - per-device N-BaIoT traffic
//!
//! Layout under the data directory:
//!
//! ```text
//! <device>/benign_traffic.csv
//! <device>/gafgyt_attacks/*.csv
//! <device>/mirai_attacks/*.csv      (absent for some devices)
//! ```
//!
//! Attack files are read in file-name order, each truncated to
//! `attack_rows_per_file` rows, then concatenated into one stream.

pub mod normalize;
pub mod reader;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use thiserror::Error;

pub use normalize::{normalize_streams, NormalizationMode, ZScore};
pub use reader::read_matrix;

pub const BENIGN_FILE: &str = "benign_traffic.csv";
pub const GAFGYT_DIR: &str = "gafgyt_attacks";
pub const MIRAI_DIR: &str = "mirai_attacks";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: row {row}, column {column}: not a number: {value:?}", .path.display())]
    Parse {
        path: PathBuf,
        row: usize,
        column: usize,
        value: String,
    },

    #[error("missing file or directory: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("no samples in {}", .0.display())]
    Empty(PathBuf),

    #[error("{}: expected {expected} columns, got {actual}", .path.display())]
    WidthMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetOptions {
    pub attack_rows_per_file: usize,
    pub normalization: NormalizationMode,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            attack_rows_per_file: crate::constants::DEFAULT_ATTACK_ROWS_PER_FILE,
            normalization: NormalizationMode::default(),
        }
    }
}

/// One device's normalized streams
#[derive(Debug, Clone)]
pub struct DeviceData {
    pub name: String,
    pub benign: Array2<f64>,
    pub attack: Array2<f64>,
}

impl DeviceData {
    pub fn width(&self) -> usize {
        self.benign.ncols()
    }
}

// ============================================================================
// HOLDOUT
// ============================================================================

/// First holdout row: `round(n * start_fraction)`, clamped to `n`.
pub fn holdout_start(rows: usize, start_fraction: f64) -> usize {
    let start = (rows as f64 * start_fraction).round();
    if start <= 0.0 {
        0
    } else {
        (start as usize).min(rows)
    }
}

/// First holdout row when the stream is read in `batch_size` blocks:
/// the holdout begins at batch `round(batches * start_fraction)`.
pub fn batch_holdout_start(rows: usize, batch_size: usize, start_fraction: f64) -> usize {
    let batch_size = batch_size.max(1);
    let batches = rows.div_ceil(batch_size);
    (holdout_start(batches, start_fraction) * batch_size).min(rows)
}

pub fn holdout(samples: ArrayView2<'_, f64>, start_fraction: f64) -> ArrayView2<'_, f64> {
    let start = holdout_start(samples.nrows(), start_fraction);
    samples.slice_move(s![start.., ..])
}

// ============================================================================
// LOADING
// ============================================================================

/// Attack CSVs of a device: gafgyt (required) then mirai (optional), each sorted.
pub fn attack_files(device_dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let gafgyt = device_dir.join(GAFGYT_DIR);
    if !gafgyt.is_dir() {
        return Err(DatasetError::MissingFile(gafgyt));
    }

    let mut files = csv_files(&gafgyt)?;

    let mirai = device_dir.join(MIRAI_DIR);
    if mirai.is_dir() {
        files.extend(csv_files(&mirai)?);
    } else {
        log::debug!("{}: no mirai attacks", device_dir.display());
    }

    Ok(files)
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let io_err = |source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn read_attacks(files: &[PathBuf], width: usize, row_limit: usize) -> Result<Array2<f64>, DatasetError> {
    let mut parts = Vec::with_capacity(files.len());
    for file in files {
        let part = read_matrix(file, Some(row_limit))?;
        if part.ncols() != width {
            return Err(DatasetError::WidthMismatch {
                path: file.clone(),
                expected: width,
                actual: part.ncols(),
            });
        }
        parts.push(part);
    }

    if parts.is_empty() {
        return Ok(Array2::zeros((0, width)));
    }

    let views: Vec<ArrayView2<'_, f64>> = parts.iter().map(|p| p.view()).collect();
    concatenate(Axis(0), &views).map_err(|_| DatasetError::WidthMismatch {
        path: files[0].clone(),
        expected: width,
        actual: 0,
    })
}

/// Load and normalize one device.
pub fn load_device(
    data_dir: &Path,
    device: &str,
    options: &DatasetOptions,
) -> Result<DeviceData, DatasetError> {
    let device_dir = data_dir.join(device);
    if !device_dir.is_dir() {
        return Err(DatasetError::MissingFile(device_dir));
    }

    let benign_path = device_dir.join(BENIGN_FILE);
    let benign = read_matrix(&benign_path, None)?;
    if benign.nrows() == 0 {
        return Err(DatasetError::Empty(benign_path));
    }

    let files = attack_files(&device_dir)?;
    let attack = read_attacks(&files, benign.ncols(), options.attack_rows_per_file)?;

    let (benign, attack) = normalize_streams(benign.view(), attack.view(), options.normalization);

    log::info!(
        "{}: {} benign rows, {} attack rows from {} files ({} features)",
        device,
        benign.nrows(),
        attack.nrows(),
        files.len(),
        benign.ncols()
    );

    Ok(DeviceData {
        name: device.to_string(),
        benign,
        attack,
    })
}

/// Load every device. All devices must share one feature width.
pub fn load_devices(
    data_dir: &Path,
    devices: &[String],
    options: &DatasetOptions,
) -> Result<Vec<DeviceData>, DatasetError> {
    let mut loaded: Vec<DeviceData> = Vec::with_capacity(devices.len());

    for device in devices {
        let data = load_device(data_dir, device, options)?;

        if let Some(first) = loaded.first() {
            if data.width() != first.width() {
                return Err(DatasetError::WidthMismatch {
                    path: data_dir.join(device).join(BENIGN_FILE),
                    expected: first.width(),
                    actual: data.width(),
                });
            }
        }

        loaded.push(data);
    }

    Ok(loaded)
}
