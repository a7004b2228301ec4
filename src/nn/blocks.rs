//! Composite blocks: the fixed layer orderings networks are assembled from.
//!
//! Every block is a pure function of an input tensor and its parameters. It
//! appends nodes named `<block>/<layer>` to the input's graph and returns the
//! block's output; the input tensor itself is never modified.
//!
//! | block                      | ordering                                           |
//! |----------------------------|----------------------------------------------------|
//! | [`convolution`]            | conv2d → (batch_norm) → activation                 |
//! | [`transposed_convolution`] | conv_transpose2d → (batch_norm) → activation       |
//! | [`maxpool`]                | max_pool2d                                         |
//! | [`dense`]                  | (flatten) → dense → (batch_norm) → activation → (dropout) |

use crate::asg::{Activation, Padding};
use crate::error::{ConfigError, Result};
use crate::nn::{ActivationLayer, BatchNorm, Conv2d, Conv2dConfig, ConvTranspose2d, Dropout, Flatten, Linear, MaxPool2d, Module};
use crate::tensor::Tensor;
use tracing::debug;

/// Parameters of a (transposed) convolution block.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvBlock {
    pub filters: usize,
    pub kernel_size: usize,
    pub stride: usize,
    pub padding: Padding,
    pub activation: Activation,
    /// Insert batch normalization between the filter bank and the activation.
    pub batch_norm: bool,
}

impl ConvBlock {
    /// Stride 1, `same` padding, batch-normalized, relu.
    pub fn new(filters: usize, kernel_size: usize) -> Self {
        Self {
            filters,
            kernel_size,
            stride: 1,
            padding: Padding::Same,
            activation: Activation::Relu,
            batch_norm: true,
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_batch_norm(mut self, batch_norm: bool) -> Self {
        self.batch_norm = batch_norm;
        self
    }

    fn layer_config(&self, in_channels: usize) -> Conv2dConfig {
        Conv2dConfig::new(in_channels, self.filters, self.kernel_size)
            .with_stride(self.stride)
            .with_padding(self.padding)
    }
}

/// Parameters of a max-pooling block.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolBlock {
    pub pool_size: usize,
    pub stride: usize,
    pub padding: Padding,
}

impl PoolBlock {
    /// Stride 1, `same` padding.
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size, stride: 1, padding: Padding::Same }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }
}

/// Parameters of a dense block.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseBlock {
    pub depth: usize,
    /// Probability of keeping a unit during training; 1.0 disables dropout.
    pub keep_probability: f32,
    pub activation: Activation,
    pub batch_norm: bool,
}

impl DenseBlock {
    /// No dropout, batch-normalized, relu.
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            keep_probability: 1.0,
            activation: Activation::Relu,
            batch_norm: true,
        }
    }

    pub fn with_keep_probability(mut self, keep_probability: f32) -> Self {
        self.keep_probability = keep_probability;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_batch_norm(mut self, batch_norm: bool) -> Self {
        self.batch_norm = batch_norm;
        self
    }
}

/// Last axis of a channels-last tensor.
fn depth_of(x: &Tensor) -> usize {
    x.shape().last().copied().unwrap_or(1)
}

fn normalize_and_activate(x: Tensor, name: &str, activation: Activation, batch_norm: bool) -> Result<Tensor> {
    let x = if batch_norm {
        BatchNorm::new(&x.context, &format!("{}/batch_norm", name), depth_of(&x))?.forward(&x)?
    } else {
        x
    };
    ActivationLayer::new(&format!("{}/activation", name), activation).forward(&x)
}

/// Convolution block: filter bank, optional batch normalization, nonlinearity.
///
/// Under `same` padding the spatial size becomes `ceil(size / stride)`; under
/// `valid` it shrinks by `kernel_size - 1` at stride 1. The output depth is
/// `block.filters`.
pub fn convolution(x: &Tensor, name: &str, block: &ConvBlock) -> Result<Tensor> {
    let config = block.layer_config(depth_of(x));
    config.output_shape(x.shape(), false)?;

    let conv = Conv2d::from_config(&x.context, &format!("{}/conv2d", name), config)?;
    let y = conv.forward(x)?;
    let y = normalize_and_activate(y, name, block.activation, block.batch_norm)?;

    debug!(block = name, shape = ?y.shape(), "convolution block");
    Ok(y)
}

/// Transposed convolution block, the upsampling counterpart of [`convolution`].
///
/// Under `same` padding the spatial size grows by a factor of `stride`.
pub fn transposed_convolution(x: &Tensor, name: &str, block: &ConvBlock) -> Result<Tensor> {
    let config = block.layer_config(depth_of(x));
    config.output_shape(x.shape(), true)?;

    let deconv = ConvTranspose2d::from_config(&x.context, &format!("{}/conv2d_transpose", name), config)?;
    let y = deconv.forward(x)?;
    let y = normalize_and_activate(y, name, block.activation, block.batch_norm)?;

    debug!(block = name, shape = ?y.shape(), "transposed convolution block");
    Ok(y)
}

/// Max-pooling block; no parameters and no activation.
pub fn maxpool(x: &Tensor, name: &str, block: &PoolBlock) -> Result<Tensor> {
    let pool = MaxPool2d::new(name, block.pool_size, block.stride).with_padding(block.padding);
    let y = pool.forward(x)?;

    debug!(block = name, shape = ?y.shape(), "max-pooling block");
    Ok(y)
}

/// Flattens any tensor to rank 2.
pub fn flatten(x: &Tensor, name: &str) -> Result<Tensor> {
    Flatten::new(name).forward(x)
}

/// Dense block: flatten, fully-connected transform, optional batch
/// normalization, nonlinearity, then dropout with `block.keep_probability`.
pub fn dense(x: &Tensor, name: &str, block: &DenseBlock) -> Result<Tensor> {
    // Checked up front so that an invalid block adds no node at all.
    if block.depth == 0 {
        return Err(ConfigError::NonPositive { field: "depth", value: 0 }.into());
    }
    let dropout = Dropout::new(&format!("{}/dropout", name), block.keep_probability)?;

    let flat = flatten(x, &format!("{}/flatten", name))?;
    let linear = Linear::new(&x.context, &format!("{}/dense", name), depth_of(&flat), block.depth)?;
    let y = linear.forward(&flat)?;
    let y = normalize_and_activate(y, name, block.activation, block.batch_norm)?;
    let y = dropout.forward(&y)?;

    debug!(block = name, depth = block.depth, drop_rate = dropout.drop_rate(), "dense block");
    Ok(y)
}
