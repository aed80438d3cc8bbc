//! Dense Autoencoder - fully connected layers from a JSON checkpoint
//!
//! Checkpoint layout:
//!
//! ```json
//! {
//!   "input_width": 115,
//!   "layers": [
//!     { "weights": [[...], ...], "bias": [...], "activation": "tanh" },
//!     ...
//!   ]
//! }
//! ```
//!
//! `weights` is row-major `out x in`. The last layer must emit `input_width` values.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::{ModelError, ReconstructionModel};

// ============================================================================
// ACTIVATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Identity => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }
}

// ============================================================================
// CHECKPOINT FORMAT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerCheckpoint {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub input_width: usize,
    pub layers: Vec<LayerCheckpoint>,
}

// ============================================================================
// LAYERS
// ============================================================================

#[derive(Debug, Clone)]
pub struct DenseLayer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    pub fn new(
        weights: Array2<f64>,
        bias: Array1<f64>,
        activation: Activation,
    ) -> Result<Self, ModelError> {
        if bias.len() != weights.nrows() {
            return Err(ModelError::InvalidCheckpoint(format!(
                "bias has {} entries, weights have {} rows",
                bias.len(),
                weights.nrows()
            )));
        }

        Ok(Self { weights, bias, activation })
    }

    pub fn in_width(&self) -> usize {
        self.weights.ncols()
    }

    pub fn out_width(&self) -> usize {
        self.weights.nrows()
    }

    fn forward(&self, input: ArrayView1<'_, f64>) -> Array1<f64> {
        let activation = self.activation;
        let mut out = self.weights.dot(&input) + &self.bias;
        out.mapv_inplace(|x| activation.apply(x));
        out
    }

    fn from_checkpoint(index: usize, layer: LayerCheckpoint) -> Result<Self, ModelError> {
        let rows = layer.weights.len();
        let cols = layer.weights.first().map(Vec::len).unwrap_or(0);

        if let Some(bad) = layer.weights.iter().position(|row| row.len() != cols) {
            return Err(ModelError::InvalidCheckpoint(format!(
                "layer {}: weight row {} has {} columns, expected {}",
                index,
                bad,
                layer.weights[bad].len(),
                cols
            )));
        }

        let flat: Vec<f64> = layer.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((rows, cols), flat)
            .map_err(|e| ModelError::InvalidCheckpoint(format!("layer {}: {}", index, e)))?;

        Self::new(weights, Array1::from(layer.bias), layer.activation)
    }

    fn to_checkpoint(&self) -> LayerCheckpoint {
        LayerCheckpoint {
            weights: self.weights.rows().into_iter().map(|row| row.to_vec()).collect(),
            bias: self.bias.to_vec(),
            activation: self.activation,
        }
    }
}

// ============================================================================
// AUTOENCODER
// ============================================================================

#[derive(Debug, Clone)]
pub struct DenseAutoencoder {
    name: String,
    input_width: usize,
    layers: Vec<DenseLayer>,
}

impl DenseAutoencoder {
    /// Build from layers, checking that shapes chain from `input_width` back to `input_width`.
    pub fn new(
        name: impl Into<String>,
        input_width: usize,
        layers: Vec<DenseLayer>,
    ) -> Result<Self, ModelError> {
        if layers.is_empty() {
            return Err(ModelError::InvalidCheckpoint("no layers".to_string()));
        }

        let mut width = input_width;
        for (i, layer) in layers.iter().enumerate() {
            if layer.in_width() != width {
                return Err(ModelError::InvalidCheckpoint(format!(
                    "layer {} expects {} inputs, previous stage emits {}",
                    i,
                    layer.in_width(),
                    width
                )));
            }
            width = layer.out_width();
        }

        if width != input_width {
            return Err(ModelError::InvalidCheckpoint(format!(
                "decoder emits {} values, input width is {}",
                width, input_width
            )));
        }

        Ok(Self {
            name: name.into(),
            input_width,
            layers,
        })
    }

    /// Single linear layer with identity weights.
    pub fn identity(width: usize) -> Self {
        let layer = DenseLayer {
            weights: Array2::eye(width),
            bias: Array1::zeros(width),
            activation: Activation::Identity,
        };

        Self {
            name: "identity".to_string(),
            input_width: width,
            layers: vec![layer],
        }
    }

    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, ModelError> {
        let layers = checkpoint
            .layers
            .into_iter()
            .enumerate()
            .map(|(i, layer)| DenseLayer::from_checkpoint(i, layer))
            .collect::<Result<Vec<_>, _>>()?;

        let name = checkpoint.name.unwrap_or_else(|| "dense-autoencoder".to_string());
        Self::new(name, checkpoint.input_width, layers)
    }

    pub fn to_checkpoint(&self) -> Checkpoint {
        Checkpoint {
            name: Some(self.name.clone()),
            input_width: self.input_width,
            layers: self.layers.iter().map(DenseLayer::to_checkpoint).collect(),
        }
    }

    /// Load checkpoint from disk
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }

        let data = fs::read(path)?;
        let checkpoint: Checkpoint = serde_json::from_slice(&data)?;
        let model = Self::from_checkpoint(checkpoint)?;

        log::info!(
            "Dense checkpoint loaded: {} ({} layers, width {})",
            model.name,
            model.layers.len(),
            model.input_width
        );

        Ok(model)
    }

    /// Save checkpoint to disk
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec_pretty(&self.to_checkpoint())?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl ReconstructionModel for DenseAutoencoder {
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

        let mut activations = sample.to_owned();
        for layer in &self.layers {
            activations = layer.forward(activations.view());
        }

        Ok(activations)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
