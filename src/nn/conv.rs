// --- File: src/nn/conv.rs ---

//! Module implementing convolutional layers for image processing.
//!
//! Tensors are channels-last: the input of a convolution has shape
//! `[H, W, C_in]` (batch axis omitted).

use crate::analysis::shape_inference::{transposed_output_size, window_output_size, ShapeInferenceError};
use crate::asg::{Padding, Shape};
use crate::error::{ConfigError, Result};
use crate::nn::module::Module;
use crate::tensor::{GraphContext, Tensor};
use std::cell::RefCell;
use std::rc::Rc;

/// Configuration for Conv2d and ConvTranspose2d layers.
#[derive(Debug, Clone, PartialEq)]
pub struct Conv2dConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of output channels (filters).
    pub filters: usize,
    /// Square kernel size, in pixels.
    pub kernel_size: usize,
    /// Convolution stride, in pixels.
    pub stride: usize,
    /// Border policy.
    pub padding: Padding,
    /// Use bias.
    pub bias: bool,
}

impl Default for Conv2dConfig {
    fn default() -> Self {
        Self {
            in_channels: 1,
            filters: 1,
            kernel_size: 3,
            stride: 1,
            padding: Padding::Same,
            bias: true,
        }
    }
}

impl Conv2dConfig {
    /// Creates Conv2d configuration.
    pub fn new(in_channels: usize, filters: usize, kernel_size: usize) -> Self {
        Self {
            in_channels,
            filters,
            kernel_size,
            ..Default::default()
        }
    }

    /// Sets convolution stride.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    /// Sets padding.
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Enables/disables bias.
    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (field, value) in [
            ("in_channels", self.in_channels),
            ("filters", self.filters),
            ("kernel_size", self.kernel_size),
            ("stride", self.stride),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        Ok(())
    }

    /// Output shape of the layer for an `[H, W, in_channels]` input, computed
    /// without touching any graph.
    ///
    /// `transposed` selects the upsampling rule of [`ConvTranspose2d`].
    pub fn output_shape(&self, input: &[usize], transposed: bool) -> Result<Shape> {
        self.validate()?;
        let op = if transposed { "ConvTranspose2d" } else { "Conv2d" };
        let &[height, width, channels] = input else {
            return Err(ShapeInferenceError::InvalidRank { op: op.to_string(), expected: 4, actual: input.len() + 1 }.into());
        };
        if channels != self.in_channels {
            return Err(ShapeInferenceError::IncompatibleShapes {
                op: op.to_string(),
                shape1: input.to_vec(),
                shape2: vec![self.kernel_size, self.kernel_size, self.in_channels, self.filters],
            }
            .into());
        }

        let extent = |size: usize| {
            if transposed {
                transposed_output_size(size, self.kernel_size, self.stride, self.padding)
            } else {
                window_output_size(op, size, self.kernel_size, self.stride, self.padding)
            }
        };
        Ok(vec![extent(height)?, extent(width)?, self.filters])
    }
}

/// 2D Convolutional layer.
///
/// Applies 2D convolution to input tensor of shape [H, W, C_in].
/// Output tensor has shape [H_out, W_out, filters].
///
/// # Example
///
/// ```rust,ignore
/// use deeposlandia::nn::{Conv2d, Module};
///
/// let conv = Conv2d::new(&context, "conv1", 3, 16, 7)?;
/// let output = conv.forward(&input)?;
/// ```
pub struct Conv2d {
    /// Symbolic descriptor for weight tensor [k, k, C_in, filters].
    pub weight: Tensor,
    /// Optional symbolic descriptor for bias [filters].
    pub bias: Option<Tensor>,
    /// Layer configuration.
    pub config: Conv2dConfig,
    /// Name of the convolution node.
    pub name: String,
}

impl Conv2d {
    /// Creates a new Conv2d layer with stride 1, `same` padding and a bias.
    ///
    /// # Arguments
    ///
    /// * `context` - Reference to GraphContext
    /// * `name` - Base name for the node and its parameters
    /// * `in_channels` - Number of input channels
    /// * `filters` - Number of output channels
    /// * `kernel_size` - Square kernel size
    pub fn new(
        context: &Rc<RefCell<GraphContext>>,
        name: &str,
        in_channels: usize,
        filters: usize,
        kernel_size: usize,
    ) -> Result<Self> {
        let config = Conv2dConfig::new(in_channels, filters, kernel_size);
        Self::from_config(context, name, config)
    }

    /// Creates Conv2d layer from configuration.
    pub fn from_config(
        context: &Rc<RefCell<GraphContext>>,
        name: &str,
        config: Conv2dConfig,
    ) -> Result<Self> {
        config.validate()?;
        let k = config.kernel_size;

        let weight_name = format!("{}.weight", name);
        let weight = Tensor::new_parameter(context, &weight_name, vec![k, k, config.in_channels, config.filters], true)?;

        let bias = if config.bias {
            let bias_name = format!("{}.bias", name);
            Some(Tensor::new_parameter(context, &bias_name, vec![config.filters], true)?)
        } else {
            None
        };

        Ok(Self { weight, bias, config, name: name.to_string() })
    }
}

impl Module for Conv2d {
    /// Applies convolution to input.
    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        inputs.conv2d(
            &self.weight,
            self.bias.as_ref(),
            self.config.stride,
            self.config.padding,
            &self.name,
        )
    }

    /// Returns parameters of the layer.
    fn parameters(&self) -> Vec<Tensor> {
        let mut params = vec![self.weight.clone()];
        if let Some(ref bias) = self.bias {
            params.push(bias.clone());
        }
        params
    }
}

/// Transposed 2D convolutional layer (deconvolution).
///
/// Used for increasing spatial dimensions (upsampling): under `same`
/// padding the output is `stride` times larger than the input.
pub struct ConvTranspose2d {
    /// Weights [k, k, filters, C_in].
    pub weight: Tensor,
    /// Optional bias [filters].
    pub bias: Option<Tensor>,
    pub config: Conv2dConfig,
    pub name: String,
}

impl ConvTranspose2d {
    /// Creates a new ConvTranspose2d layer with stride 1, `same` padding and a bias.
    pub fn new(
        context: &Rc<RefCell<GraphContext>>,
        name: &str,
        in_channels: usize,
        filters: usize,
        kernel_size: usize,
    ) -> Result<Self> {
        Self::from_config(context, name, Conv2dConfig::new(in_channels, filters, kernel_size))
    }

    pub fn from_config(
        context: &Rc<RefCell<GraphContext>>,
        name: &str,
        config: Conv2dConfig,
    ) -> Result<Self> {
        config.validate()?;
        let k = config.kernel_size;

        let weight_name = format!("{}.weight", name);
        let weight = Tensor::new_parameter(context, &weight_name, vec![k, k, config.filters, config.in_channels], true)?;

        let bias = if config.bias {
            let bias_name = format!("{}.bias", name);
            Some(Tensor::new_parameter(context, &bias_name, vec![config.filters], true)?)
        } else {
            None
        };

        Ok(Self { weight, bias, config, name: name.to_string() })
    }
}

impl Module for ConvTranspose2d {
    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        inputs.conv_transpose2d(
            &self.weight,
            self.bias.as_ref(),
            self.config.stride,
            self.config.padding,
            &self.name,
        )
    }

    fn parameters(&self) -> Vec<Tensor> {
        let mut params = vec![self.weight.clone()];
        if let Some(ref bias) = self.bias {
            params.push(bias.clone());
        }
        params
    }
}
