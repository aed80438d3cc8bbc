use thiserror::Error;

use super::confusion::Metric;
use crate::logic::model::ModelError;

#[derive(Debug, Error)]
pub enum ScoringError {
    /// Sample and model disagree on the number of features.
    #[error("shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A ratio's denominator is zero.
    #[error("{metric} is undefined: {reason}")]
    UndefinedMetric { metric: Metric, reason: &'static str },

    #[error(transparent)]
    Model(ModelError),
}

impl From<ModelError> for ScoringError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InputWidth { expected, actual } => {
                ScoringError::ShapeMismatch { expected, actual }
            }
            other => ScoringError::Model(other),
        }
    }
}
