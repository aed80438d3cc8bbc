//! Evaluation configuration
//!
//! Everything a run needs, passed explicitly to the pipeline.
//! Values come from `FEDIOT_*` environment variables (a `.env` file is
//! honoured by the binary), then CLI flags override them.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants;
use crate::logic::dataset::{DatasetOptions, NormalizationMode};
use crate::logic::threshold::ThresholdBasis;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// DEVICE
// ============================================================================

/// Compute target for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
}

impl FromStr for Device {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "gpu" | "cuda" => Ok(Device::Gpu),
            other => Err(ConfigError::InvalidValue {
                key: "device".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Gpu => f.write_str("gpu"),
        }
    }
}

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Dataset root, one sub-directory per device
    pub data_dir: PathBuf,

    /// Model checkpoint (`.onnx` or dense JSON)
    pub model_path: PathBuf,

    pub device: Device,

    /// Devices evaluated together
    pub devices: Vec<String>,

    /// Rows per benign batch; also scales the standard error in the threshold policy
    pub batch_size: usize,

    /// Batch or single-row scores for the threshold statistics
    pub threshold_basis: ThresholdBasis,

    /// One run per multiplier
    pub k_values: Vec<f64>,

    pub attack_rows_per_file: usize,

    /// Fraction of benign rows skipped before the holdout
    pub holdout_start: f64,

    pub input_width: usize,

    /// Scoring threads (<= 1 scores inline)
    pub workers: usize,

    /// Per-device thresholds; replaces the k runs when set
    pub threshold_map: Option<PathBuf>,

    /// JSONL report destination
    pub report_path: Option<PathBuf>,

    pub normalization: NormalizationMode,

    /// Include per-device counts in each summary
    pub per_device: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(constants::DEFAULT_DATA_DIR),
            model_path: PathBuf::from(constants::DEFAULT_MODEL_PATH),
            device: Device::default(),
            devices: constants::DEFAULT_DEVICES.iter().map(|d| d.to_string()).collect(),
            batch_size: constants::DEFAULT_BATCH_SIZE,
            threshold_basis: ThresholdBasis::default(),
            k_values: constants::DEFAULT_K_VALUES.to_vec(),
            attack_rows_per_file: constants::DEFAULT_ATTACK_ROWS_PER_FILE,
            holdout_start: constants::DEFAULT_HOLDOUT_START,
            input_width: constants::N_BAIOT_FEATURE_COUNT,
            workers: 1,
            threshold_map: None,
            report_path: None,
            normalization: NormalizationMode::default(),
            per_device: false,
        }
    }
}

impl EvalConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    /// Unparseable values are logged and fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            data_dir: lookup("FEDIOT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),

            model_path: lookup("FEDIOT_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),

            device: parsed(&lookup, "FEDIOT_DEVICE").unwrap_or(defaults.device),

            devices: lookup("FEDIOT_DEVICES")
                .map(|v| split_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.devices),

            batch_size: parsed(&lookup, "FEDIOT_BATCH_SIZE").unwrap_or(defaults.batch_size),

            threshold_basis: parsed(&lookup, "FEDIOT_THRESHOLD_BASIS")
                .unwrap_or(defaults.threshold_basis),

            k_values: lookup("FEDIOT_K_VALUES")
                .and_then(|v| parse_k_values(&v))
                .unwrap_or(defaults.k_values),

            attack_rows_per_file: parsed(&lookup, "FEDIOT_ATTACK_ROWS")
                .unwrap_or(defaults.attack_rows_per_file),

            holdout_start: parsed(&lookup, "FEDIOT_HOLDOUT_START").unwrap_or(defaults.holdout_start),

            input_width: parsed(&lookup, "FEDIOT_INPUT_WIDTH").unwrap_or(defaults.input_width),

            workers: parsed(&lookup, "FEDIOT_WORKERS").unwrap_or(defaults.workers),

            threshold_map: lookup("FEDIOT_THRESHOLD_MAP").map(PathBuf::from),

            report_path: lookup("FEDIOT_REPORT_PATH").map(PathBuf::from),

            normalization: parsed(&lookup, "FEDIOT_NORMALIZE").unwrap_or(defaults.normalization),

            per_device: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::Invalid("no devices configured".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch size must be positive".to_string()));
        }
        if self.threshold_map.is_none() && self.k_values.is_empty() {
            return Err(ConfigError::Invalid(
                "no k values and no threshold map".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.holdout_start) {
            return Err(ConfigError::Invalid(format!(
                "holdout start must be in [0, 1), got {}",
                self.holdout_start
            )));
        }
        if self.attack_rows_per_file == 0 {
            return Err(ConfigError::Invalid("attack rows per file must be positive".to_string()));
        }
        if self.input_width == 0 {
            return Err(ConfigError::Invalid("input width must be positive".to_string()));
        }
        Ok(())
    }

    pub fn dataset_options(&self) -> DatasetOptions {
        DatasetOptions {
            attack_rows_per_file: self.attack_rows_per_file,
            normalization: self.normalization,
        }
    }
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}

/// Comma separated names, blanks dropped
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma separated multipliers; `None` if any entry is not a finite number
pub fn parse_k_values(raw: &str) -> Option<Vec<f64>> {
    let values: Option<Vec<f64>> = split_list(raw)
        .iter()
        .map(|s| s.parse::<f64>().ok().filter(|k| k.is_finite()))
        .collect();

    if values.is_none() {
        log::warn!("Ignoring invalid k values {:?}, using default", raw);
    }
    values.filter(|v| !v.is_empty())
}
