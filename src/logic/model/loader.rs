//! Model Loader - backend selection by checkpoint extension

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ndarray::{Array1, ArrayView1};
use sha2::{Digest, Sha256};

use crate::logic::config::Device;
use super::{DenseAutoencoder, ModelError, OnnxAutoencoder, ReconstructionModel};

/// Model resolved from a checkpoint path
pub enum LoadedModel {
    Dense(DenseAutoencoder),
    Onnx(OnnxAutoencoder),
}

impl LoadedModel {
    /// `.onnx` files go through ONNX Runtime, anything else is read as a dense JSON checkpoint.
    pub fn load(path: &Path, input_width: usize, device: Device) -> Result<Self, ModelError> {
        if device == Device::Gpu {
            log::warn!("GPU inference not available in this build, falling back to CPU");
        }

        let is_onnx = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("onnx"))
            .unwrap_or(false);

        if is_onnx {
            return Ok(LoadedModel::Onnx(OnnxAutoencoder::load(path, input_width)?));
        }

        let model = DenseAutoencoder::load(path)?;
        if model.input_width() != input_width {
            log::warn!(
                "Checkpoint width {} differs from configured width {}, using checkpoint width",
                model.input_width(),
                input_width
            );
        }
        Ok(LoadedModel::Dense(model))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            LoadedModel::Dense(_) => "dense",
            LoadedModel::Onnx(_) => "onnx",
        }
    }
}

impl ReconstructionModel for LoadedModel {
    fn input_width(&self) -> usize {
        match self {
            LoadedModel::Dense(m) => m.input_width(),
            LoadedModel::Onnx(m) => m.input_width(),
        }
    }

    fn reconstruct(&self, sample: ArrayView1<'_, f64>) -> Result<Array1<f64>, ModelError> {
        match self {
            LoadedModel::Dense(m) => m.reconstruct(sample),
            LoadedModel::Onnx(m) => m.reconstruct(sample),
        }
    }

    fn name(&self) -> &str {
        match self {
            LoadedModel::Dense(m) => m.name(),
            LoadedModel::Onnx(m) => m.name(),
        }
    }
}

/// SHA-256 of the checkpoint file, hex encoded
pub fn model_checksum(path: &Path) -> Result<String, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
