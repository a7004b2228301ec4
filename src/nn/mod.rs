//! # Neural Network Layers Module
//!
//! Building blocks for constructing convolutional networks.
//!
//! In the graph-based architecture, each "layer" is a constructor that adds
//! a specific pattern of nodes (operations and parameters) to the ASG.
//!
//! ## Available Layers
//!
//! - [`Conv2d`], [`ConvTranspose2d`]: channels-last 2D (de)convolution
//! - [`MaxPool2d`]: max pooling with `same`/`valid` padding
//! - [`Linear`]: fully connected / dense layer
//! - [`BatchNorm`]: batch normalization over the last axis
//! - [`ActivationLayer`]: relu, sigmoid, softmax, tanh, linear
//! - [`Flatten`], [`Dropout`]
//!
//! ## Blocks
//!
//! The [`blocks`] module composes the layers into the fixed orderings that
//! architectures are assembled from: [`convolution`], [`transposed_convolution`],
//! [`maxpool`] and [`dense`].
//!
//! ## Example
//!
//! ```ignore
//! use deeposlandia::nn::{convolution, maxpool, ConvBlock, PoolBlock};
//! use deeposlandia::tensor::{GraphContext, Phase, Tensor};
//!
//! let ctx = GraphContext::shared(Phase::Training);
//! let x = Tensor::new_input(&ctx, "input", vec![512, 512, 3])?;
//! let h = convolution(&x, "conv1", &ConvBlock::new(16, 7))?;
//! let h = maxpool(&h, "pool1", &PoolBlock::new(2).with_stride(2))?;
//! ```

pub mod activations;
pub mod batchnorm;
pub mod blocks;
pub mod conv;
pub mod dropout;
pub mod flatten;
pub mod linear;
pub mod module;
pub mod pooling;

pub use crate::asg::{Activation, Padding};
pub use activations::ActivationLayer;
pub use batchnorm::BatchNorm;
pub use blocks::{convolution, dense, flatten, maxpool, transposed_convolution, ConvBlock, DenseBlock, PoolBlock};
pub use conv::{Conv2d, Conv2dConfig, ConvTranspose2d};
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use linear::Linear;
pub use pooling::MaxPool2d;

// Base trait
pub use module::Module;
