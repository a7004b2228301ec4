// --- File: src/nn/pooling.rs ---

//! Module implementing pooling layers for CNNs.

use crate::asg::Padding;
use crate::error::Result;
use crate::nn::module::Module;
use crate::tensor::Tensor;

/// Max Pooling 2D layer.
///
/// Applies max pooling to input tensor of shape [H, W, C].
/// Selects maximum value from each window; windows overlap when
/// `stride < pool_size`.
///
/// # Example
///
/// ```rust,ignore
/// let pool = MaxPool2d::new("pool1", 2, 2);
/// let output = pool.forward(&input)?; // Reduces H and W by half
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MaxPool2d {
    /// Square window size.
    pub pool_size: usize,
    /// Stride; the downscaling factor under `same` padding.
    pub stride: usize,
    pub padding: Padding,
    pub name: String,
}

impl MaxPool2d {
    /// Creates MaxPool2d layer with `same` padding.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the pooling node
    /// * `pool_size` - Pooling window size
    /// * `stride` - Pooling stride (usually equals pool_size)
    pub fn new(name: &str, pool_size: usize, stride: usize) -> Self {
        Self {
            pool_size,
            stride,
            padding: Padding::Same,
            name: name.to_string(),
        }
    }

    /// Sets padding.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }
}

impl Module for MaxPool2d {
    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        inputs.max_pool2d(self.pool_size, self.stride, self.padding, &self.name)
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![] // Pooling layers have no parameters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, Error};
    use crate::tensor::{GraphContext, Phase};

    #[test]
    fn test_max_pool2d_halves() {
        let context = GraphContext::shared(Phase::Training);
        let input = Tensor::new_input(&context, "input", vec![512, 512, 16]).unwrap();
        let pool = MaxPool2d::new("pool1", 2, 2);

        let output = pool.forward(&input).unwrap();
        assert_eq!(output.shape(), &[256, 256, 16]);
        assert!(pool.parameters().is_empty());
    }

    #[test]
    fn test_overlapping_windows_keep_size_at_stride_one() {
        let context = GraphContext::shared(Phase::Training);
        let input = Tensor::new_input(&context, "input", vec![10, 10, 4]).unwrap();
        let output = MaxPool2d::new("pool", 3, 1).forward(&input).unwrap();
        assert_eq!(output.shape(), &[10, 10, 4]);
    }

    #[test]
    fn test_valid_pool_larger_than_input_fails() {
        let context = GraphContext::shared(Phase::Training);
        let input = Tensor::new_input(&context, "input", vec![2, 2, 4]).unwrap();
        let pool = MaxPool2d::new("pool", 3, 1).with_padding(Padding::Valid);

        assert!(matches!(
            pool.forward(&input),
            Err(Error::Config(ConfigError::DegenerateSpatialSize { input: 2, window: 3, .. }))
        ));
    }
}
