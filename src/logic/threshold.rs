//! Threshold Derivation
//!
//! Decision thresholds from benign holdout scores:
//! `mean + k * std / sqrt(batch_size)`, one run per `k`.
//! The statistics are taken over batch scores (MSE of each `batch_size`
//! row block) by default, or over single-row scores.
//! Alternatively a precomputed per-device map loaded from JSON.
//! The scorer itself never sees how a threshold was derived.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logic::config::ConfigError;

#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error("at least two scores are needed to derive a threshold, got {count}")]
    InsufficientScores { count: usize },

    #[error("batch size must be positive")]
    InvalidBatchSize,

    #[error("threshold multiplier must be finite, got {0}")]
    InvalidMultiplier(f64),

    #[error("no threshold configured for device {0}")]
    MissingDevice(String),

    #[error("threshold for device {device} is not finite: {value}")]
    NonFinite { device: String, value: f64 },

    #[error("threshold map io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("threshold map parse error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// SCORE BASIS
// ============================================================================

/// Which benign scores feed `ScoreStats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThresholdBasis {
    /// One score per `batch_size` block, holdout cut by batch index
    #[default]
    Batch,
    /// One score per row, holdout cut by row index
    Sample,
}

impl FromStr for ThresholdBasis {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "batch" => Ok(ThresholdBasis::Batch),
            "sample" | "row" => Ok(ThresholdBasis::Sample),
            other => Err(ConfigError::InvalidValue {
                key: "threshold basis".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ThresholdBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdBasis::Batch => f.write_str("batch"),
            ThresholdBasis::Sample => f.write_str("sample"),
        }
    }
}

/// Mean of each consecutive `batch_size` block of row scores.
///
/// With equal-width rows this is the MSE over the whole block. The last
/// block may be shorter.
pub fn batch_scores(row_scores: &[f64], batch_size: usize) -> Vec<f64> {
    row_scores
        .chunks(batch_size.max(1))
        .map(|block| block.iter().sum::<f64>() / block.len() as f64)
        .collect()
}

// ============================================================================
// SCORE STATISTICS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
}

impl ScoreStats {
    pub fn from_scores(scores: &[f64]) -> Result<Self, ThresholdError> {
        let count = scores.len();
        if count < 2 {
            return Err(ThresholdError::InsufficientScores { count });
        }

        let n = count as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);

        Ok(Self {
            count,
            mean,
            std: variance.sqrt(),
        })
    }
}

// ============================================================================
// POLICY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPolicy {
    /// Multiplier on the standard error
    pub k: f64,
    pub batch_size: usize,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            k: 0.0,
            batch_size: crate::constants::DEFAULT_BATCH_SIZE,
        }
    }
}

impl ThresholdPolicy {
    pub fn new(k: f64, batch_size: usize) -> Result<Self, ThresholdError> {
        if batch_size == 0 {
            return Err(ThresholdError::InvalidBatchSize);
        }
        if !k.is_finite() {
            return Err(ThresholdError::InvalidMultiplier(k));
        }
        Ok(Self { k, batch_size })
    }

    pub fn threshold(&self, stats: &ScoreStats) -> f64 {
        stats.mean + self.k * stats.std / (self.batch_size as f64).sqrt()
    }

    pub fn label(&self) -> String {
        format!("k={}", self.k)
    }
}

/// One policy per multiplier, in the given order
pub fn policies(k_values: &[f64], batch_size: usize) -> Result<Vec<ThresholdPolicy>, ThresholdError> {
    k_values
        .iter()
        .map(|&k| ThresholdPolicy::new(k, batch_size))
        .collect()
}

// ============================================================================
// PER-DEVICE MAP
// ============================================================================

/// Device name → precomputed threshold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdMap {
    thresholds: BTreeMap<String, f64>,
}

impl ThresholdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load map from a JSON object `{ "device": threshold, ... }`
    pub fn load(path: &Path) -> Result<Self, ThresholdError> {
        let data = fs::read(path)?;
        let map: ThresholdMap = serde_json::from_slice(&data)?;

        for (device, &value) in &map.thresholds {
            if !value.is_finite() {
                return Err(ThresholdError::NonFinite {
                    device: device.clone(),
                    value,
                });
            }
        }

        log::info!("Loaded {} device thresholds from {}", map.len(), path.display());
        Ok(map)
    }

    pub fn insert(&mut self, device: impl Into<String>, threshold: f64) {
        self.thresholds.insert(device.into(), threshold);
    }

    pub fn get(&self, device: &str) -> Result<f64, ThresholdError> {
        self.thresholds
            .get(device)
            .copied()
            .ok_or_else(|| ThresholdError::MissingDevice(device.to_string()))
    }

    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }
}
