//! Model Module - Reconstruction models
//!
//! Anything that maps a sample back onto its own feature space.
//! The scorer only needs `ReconstructionModel`; backends are swappable.
//!
//! - `dense` - fully connected autoencoder from a JSON checkpoint
//! - `onnx` - exported graph run through ONNX Runtime
//! - `loader` - backend selection and checkpoint fingerprinting

pub mod dense;
pub mod loader;
pub mod onnx;

use std::path::PathBuf;

use ndarray::{Array1, ArrayView1};
use thiserror::Error;

// Re-export common types
pub use dense::{Activation, DenseAutoencoder, DenseLayer};
pub use loader::{model_checksum, LoadedModel};
pub use onnx::OnnxAutoencoder;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid checkpoint: {0}")]
    InvalidCheckpoint(String),

    #[error("input width mismatch: expected {expected}, got {actual}")]
    InputWidth { expected: usize, actual: usize },

    #[error("inference failed: {0}")]
    Runtime(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint parse error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// MODEL TRAIT
// ============================================================================

/// A model trained to reproduce its input.
///
/// `reconstruct` must return a vector with the same width as the sample.
pub trait ReconstructionModel {
    /// Number of features one sample must carry.
    fn input_width(&self) -> usize;

    fn reconstruct(&self, sample: ArrayView1<'_, f64>) -> Result<Array1<f64>, ModelError>;

    fn name(&self) -> &str;
}
