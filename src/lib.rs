//! FedIoT Eval - autoencoder anomaly evaluation for IoT traffic
//!
//! Scores each sample by reconstruction error, flags it when the score
//! exceeds a threshold, and reports accuracy, precision and false positive
//! rate over benign and attack streams.

pub mod constants;
pub mod logic;

// Re-export common types
pub use logic::config::{Device, EvalConfig};
pub use logic::model::{ModelError, ReconstructionModel};
pub use logic::pipeline::run_evaluation;
pub use logic::scoring::{
    classify, evaluate, evaluate_parallel, score, ConfusionCounts, Metric, MetricsReport,
    ScoringError,
};
