//! Z-score normalization
//!
//! Per-column mean and sample std (n - 1), NaN entries skipped while fitting.
//! Non-finite results (constant columns, NaN inputs) are replaced by 0.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use crate::logic::config::ConfigError;

/// Which statistics each stream is normalized against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizationMode {
    /// Both streams use the device's benign statistics
    #[default]
    BenignStats,
    /// Each stream uses its own statistics
    PerStream,
}

impl FromStr for NormalizationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "benign" | "benign-stats" => Ok(NormalizationMode::BenignStats),
            "per-stream" | "self" => Ok(NormalizationMode::PerStream),
            other => Err(ConfigError::InvalidValue {
                key: "normalize".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationMode::BenignStats => f.write_str("benign-stats"),
            NormalizationMode::PerStream => f.write_str("per-stream"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZScore {
    mean: Array1<f64>,
    std: Array1<f64>,
}

impl ZScore {
    pub fn fit(samples: ArrayView2<'_, f64>) -> Self {
        let width = samples.ncols();
        let mut mean = Array1::from_elem(width, f64::NAN);
        let mut std = Array1::from_elem(width, f64::NAN);

        for (j, column) in samples.columns().into_iter().enumerate() {
            let present: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
            if present.is_empty() {
                continue;
            }

            let n = present.len() as f64;
            let m = present.iter().sum::<f64>() / n;
            mean[j] = m;

            if present.len() > 1 {
                let variance = present.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0);
                std[j] = variance.sqrt();
            }
        }

        Self { mean, std }
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn apply(&self, samples: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = samples.to_owned();
        for mut row in out.rows_mut() {
            Zip::from(&mut row)
                .and(&self.mean)
                .and(&self.std)
                .for_each(|x, &m, &s| {
                    let z = (*x - m) / s;
                    *x = if z.is_finite() { z } else { 0.0 };
                });
        }
        out
    }
}

/// Normalize one device's streams according to `mode`.
pub fn normalize_streams(
    benign: ArrayView2<'_, f64>,
    attack: ArrayView2<'_, f64>,
    mode: NormalizationMode,
) -> (Array2<f64>, Array2<f64>) {
    let benign_stats = ZScore::fit(benign);
    let attack_stats = match mode {
        NormalizationMode::BenignStats => benign_stats.clone(),
        NormalizationMode::PerStream => ZScore::fit(attack),
    };

    (benign_stats.apply(benign), attack_stats.apply(attack))
}
