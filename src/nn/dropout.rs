//! Dropout layer for regularization.
//!
//! The layer takes a *keep* probability: each unit survives with probability
//! `keep_probability` and is zeroed with probability `1 - keep_probability`.

use crate::error::{ConfigError, Result};
use crate::nn::Module;
use crate::tensor::Tensor;

/// Dropout layer.
///
/// Only training graphs record it (see [`Phase`](crate::tensor::Phase)); at
/// inference the input passes through unchanged. `keep_probability == 1.0`
/// never records a node, so the resulting graph is fully deterministic.
///
/// # Example
/// ```ignore
/// let dropout = Dropout::new("fc1/dropout", 0.25)?; // keeps 25% of the units
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Dropout {
    /// Probability of keeping a unit, in (0, 1].
    pub keep_probability: f32,
    pub name: String,
}

impl Dropout {
    /// Creates a new Dropout layer.
    ///
    /// Fails when `keep_probability` is outside (0, 1].
    pub fn new(name: &str, keep_probability: f32) -> std::result::Result<Self, ConfigError> {
        if !(keep_probability > 0.0 && keep_probability <= 1.0) {
            return Err(ConfigError::InvalidKeepProbability(keep_probability));
        }
        Ok(Self { keep_probability, name: name.to_string() })
    }

    /// Probability of zeroing a unit.
    pub fn drop_rate(&self) -> f32 {
        1.0 - self.keep_probability
    }

    pub fn is_identity(&self) -> bool {
        self.keep_probability >= 1.0
    }
}

impl Module for Dropout {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        if self.is_identity() {
            return Ok(x.clone());
        }
        x.dropout(self.keep_probability, &self.name)
    }

    fn parameters(&self) -> Vec<Tensor> {
        // Dropout has no parameters
        Vec::new()
    }
}
