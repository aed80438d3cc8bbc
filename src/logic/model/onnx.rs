//! ONNX Autoencoder - ONNX Runtime Integration
//!
//! Runs an exported autoencoder graph one sample at a time.
//! Input is fed as a `(1, width)` f32 tensor; the first graph output is the reconstruction.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::{ModelError, ReconstructionModel};

pub struct OnnxAutoencoder {
    // Session::run needs &mut
    session: Mutex<Session>,
    output_name: String,
    input_width: usize,
    name: String,
}

impl OnnxAutoencoder {
    /// Load ONNX model from file
    pub fn load(path: &Path, input_width: usize) -> Result<Self, ModelError> {
        log::info!("Loading ONNX model from: {}", path.display());

        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| ModelError::Runtime(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::Runtime(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| ModelError::InvalidCheckpoint(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| ModelError::InvalidCheckpoint("No output defined".to_string()))?;

        log::info!("ONNX model loaded successfully (output: {})", output_name);

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx-autoencoder".to_string());

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            input_width,
            name,
        })
    }
}

impl ReconstructionModel for OnnxAutoencoder {
    fn input_width(&self) -> usize {
        self.input_width
    }

    fn reconstruct(&self, sample: ArrayView1<'_, f64>) -> Result<Array1<f64>, ModelError> {
        if sample.len() != self.input_width {
            return Err(ModelError::InputWidth {
                expected: self.input_width,
                actual: sample.len(),
            });
        }

        let input_data: Vec<f32> = sample.iter().map(|&v| v as f32).collect();
        let input_array = Array2::<f32>::from_shape_vec((1, self.input_width), input_data)
            .map_err(|e| ModelError::Runtime(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| ModelError::Runtime(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ModelError::Runtime(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| ModelError::Runtime("No output".to_string()))?;

        let output_tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Runtime(format!("Extract error: {}", e)))?;

        Ok(output_tensor.1.iter().map(|&v| f64::from(v)).collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
