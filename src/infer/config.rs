//! Checkpoint hyperparameters.
//!
//! A trained checkpoint directory carries a `parameters.json` describing the
//! network shape. It is loaded once, validated, and then passed around
//! immutably.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::SPECTRUM_LEN;
use crate::error::{AppError, ErrorKind};

/// File name inside a checkpoint directory.
pub const PARAMETERS_FILE: &str = "parameters.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Widths of the fully connected stack.
    pub fc_filters: Vec<usize>,
    /// Filter counts of the tensor-branch convolutions.
    #[serde(default)]
    pub tconv_fnums: Vec<usize>,
    /// Output length of each transposed convolution.
    pub tconv_dims: Vec<usize>,
    /// Channel count of each transposed convolution.
    pub tconv_filters: Vec<usize>,
    #[serde(default)]
    pub n_filter: usize,
    pub n_branch: usize,
    #[serde(default)]
    pub reg_scale: f64,
    pub batch_size: usize,
}

fn model_err(msg: String) -> AppError {
    AppError::new(ErrorKind::Model, msg)
}

impl ModelConfig {
    /// Load `<checkpoint>/parameters.json` and validate it.
    pub fn load(checkpoint: &Path) -> Result<Self, AppError> {
        let path = checkpoint.join(PARAMETERS_FILE);
        let file = File::open(&path).map_err(|e| {
            AppError::new(
                ErrorKind::Io,
                format!("model: failed to open '{}': {e}", path.display()),
            )
        })?;
        let config: ModelConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| model_err(format!("model: failed to parse '{}': {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Length of the predicted curve.
    pub fn output_len(&self) -> usize {
        self.tconv_dims
            .last()
            .or(self.fc_filters.last())
            .copied()
            .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.fc_filters.is_empty() || self.fc_filters.contains(&0) {
            return Err(model_err(format!(
                "model: fc_filters must be non-empty and positive (got {:?}).",
                self.fc_filters
            )));
        }
        if self.tconv_dims.len() != self.tconv_filters.len() {
            return Err(model_err(format!(
                "model: {} tconv_dims but {} tconv_filters.",
                self.tconv_dims.len(),
                self.tconv_filters.len()
            )));
        }
        if self.tconv_filters.contains(&0) {
            return Err(model_err("model: tconv_filters must be positive.".to_string()));
        }

        // Each transposed convolution upsamples by an integer stride.
        let mut feature_dim = self.fc_filters[self.fc_filters.len() - 1];
        for (i, &size) in self.tconv_dims.iter().enumerate() {
            if size == 0 || size % feature_dim != 0 {
                return Err(model_err(format!(
                    "model: tconv_dims[{i}]={size} is not a multiple of the previous width {feature_dim}."
                )));
            }
            feature_dim = size;
        }

        if self.output_len() != SPECTRUM_LEN {
            return Err(model_err(format!(
                "model: network produces {} points, expected {SPECTRUM_LEN}.",
                self.output_len()
            )));
        }
        if self.n_branch == 0 {
            return Err(model_err("model: n_branch must be > 0.".to_string()));
        }
        if !(self.reg_scale.is_finite() && self.reg_scale >= 0.0) {
            return Err(model_err(format!(
                "model: reg_scale must be finite and >= 0 (got {}).",
                self.reg_scale
            )));
        }
        if self.batch_size == 0 {
            return Err(model_err("model: batch_size must be > 0.".to_string()));
        }
        Ok(())
    }
}
