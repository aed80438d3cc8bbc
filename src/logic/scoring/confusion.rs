//! Confusion counts and the metrics derived from them

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use super::error::ScoringError;

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    Precision,
    FalsePositiveRate,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Accuracy, Metric::Precision, Metric::FalsePositiveRate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::Precision => "precision",
            Metric::FalsePositiveRate => "false positive rate",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final metrics of one evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub accuracy: f64,
    pub precision: f64,
    pub false_positive_rate: f64,
}

/// One metric as the reporter sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricValue {
    Defined { value: f64 },
    Undefined { reason: String },
}

impl MetricValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Defined { value } => Some(*value),
            MetricValue::Undefined { .. } => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Defined { value } => write!(f, "{}", value),
            MetricValue::Undefined { reason } => write!(f, "undefined ({})", reason),
        }
    }
}

// ============================================================================
// CONFUSION COUNTS
// ============================================================================

/// Benign samples are the negative class, attack samples the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_negative: u64,
    pub false_positive: u64,
    pub true_positive: u64,
    pub false_negative: u64,
}

impl ConfusionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_benign(&mut self, flagged: bool) {
        if flagged {
            self.false_positive += 1;
        } else {
            self.true_negative += 1;
        }
    }

    pub fn record_attack(&mut self, flagged: bool) {
        if flagged {
            self.true_positive += 1;
        } else {
            self.false_negative += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.true_negative + self.false_positive + self.true_positive + self.false_negative
    }

    pub fn benign_total(&self) -> u64 {
        self.true_negative + self.false_positive
    }

    pub fn attack_total(&self) -> u64 {
        self.true_positive + self.false_negative
    }

    /// (TP + TN) / total
    pub fn accuracy(&self) -> Result<f64, ScoringError> {
        ratio(
            Metric::Accuracy,
            self.true_positive + self.true_negative,
            self.total(),
            "no samples were evaluated",
        )
    }

    /// TP / (TP + FP)
    pub fn precision(&self) -> Result<f64, ScoringError> {
        ratio(
            Metric::Precision,
            self.true_positive,
            self.true_positive + self.false_positive,
            "no samples were flagged anomalous",
        )
    }

    /// FP / (FP + TN)
    pub fn false_positive_rate(&self) -> Result<f64, ScoringError> {
        ratio(
            Metric::FalsePositiveRate,
            self.false_positive,
            self.benign_total(),
            "no benign samples were evaluated",
        )
    }

    pub fn metric(&self, metric: Metric) -> Result<f64, ScoringError> {
        match metric {
            Metric::Accuracy => self.accuracy(),
            Metric::Precision => self.precision(),
            Metric::FalsePositiveRate => self.false_positive_rate(),
        }
    }

    pub fn metric_value(&self, metric: Metric) -> MetricValue {
        match self.metric(metric) {
            Ok(value) => MetricValue::Defined { value },
            Err(ScoringError::UndefinedMetric { reason, .. }) => MetricValue::Undefined {
                reason: reason.to_string(),
            },
            Err(other) => MetricValue::Undefined {
                reason: other.to_string(),
            },
        }
    }

    /// All three metrics, or the first one that is undefined.
    pub fn report(&self) -> Result<MetricsReport, ScoringError> {
        Ok(MetricsReport {
            accuracy: self.accuracy()?,
            precision: self.precision()?,
            false_positive_rate: self.false_positive_rate()?,
        })
    }
}

fn ratio(
    metric: Metric,
    numerator: u64,
    denominator: u64,
    reason: &'static str,
) -> Result<f64, ScoringError> {
    if denominator == 0 {
        return Err(ScoringError::UndefinedMetric { metric, reason });
    }
    Ok(numerator as f64 / denominator as f64)
}

impl Add for ConfusionCounts {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for ConfusionCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.true_negative += rhs.true_negative;
        self.false_positive += rhs.false_positive;
        self.true_positive += rhs.true_positive;
        self.false_negative += rhs.false_negative;
    }
}

impl Sum for ConfusionCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}
