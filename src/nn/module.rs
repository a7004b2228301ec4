//! Module defining the core `Module` trait for all neural network layers.

use crate::error::Result;
use crate::tensor::Tensor;

/// Trait defining the common interface for all layers/modules.
///
/// In the graph-based architecture, `Module` is any component that can
/// add a specific pattern of operations and parameters to the graph.
pub trait Module {
    /// Performs a "symbolic" forward pass, building the corresponding part of the graph.
    ///
    /// Takes an input symbolic tensor and returns an output symbolic tensor,
    /// or the error that kept the nodes out of the graph.
    fn forward(&self, inputs: &Tensor) -> Result<Tensor>;

    /// Returns a list of all parameters (as symbolic tensors)
    /// that belong to this module.
    fn parameters(&self) -> Vec<Tensor>;
}
