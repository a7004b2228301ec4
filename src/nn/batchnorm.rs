//! Batch normalization layer for the graph architecture.
//!
//! Normalizes over the last axis (channels of an image tensor, features of a
//! dense one) with trainable `gamma`/`beta` and non-trainable moving
//! statistics, as Keras does.

use crate::error::Result;
use crate::nn::Module;
use crate::tensor::{GraphContext, Tensor};
use std::cell::RefCell;
use std::rc::Rc;

/// Small constant for numerical stability.
const EPS: f32 = 1e-3;

/// Momentum of the moving statistics.
const DEFAULT_MOMENTUM: f32 = 0.99;

/// Batch Normalization layer.
///
/// y = gamma * (x - mean) / sqrt(var + eps) + beta
///
/// Batch statistics are used while training and the moving statistics at
/// inference; that choice belongs to the executing runtime.
pub struct BatchNorm {
    /// Trainable scale.
    pub gamma: Tensor,
    /// Trainable shift.
    pub beta: Tensor,
    pub moving_mean: Tensor,
    pub moving_variance: Tensor,
    pub epsilon: f32,
    pub momentum: f32,
    /// Layer name (also the prefix of its parameters).
    pub name: String,
}

impl BatchNorm {
    /// Creates a new BatchNorm layer over `features` channels.
    pub fn new(ctx: &Rc<RefCell<GraphContext>>, name: &str, features: usize) -> Result<Self> {
        let gamma = Tensor::new_parameter(ctx, &format!("{}.gamma", name), vec![features], true)?;
        let beta = Tensor::new_parameter(ctx, &format!("{}.beta", name), vec![features], true)?;
        let moving_mean = Tensor::new_parameter(ctx, &format!("{}.moving_mean", name), vec![features], false)?;
        let moving_variance =
            Tensor::new_parameter(ctx, &format!("{}.moving_variance", name), vec![features], false)?;

        Ok(Self {
            gamma,
            beta,
            moving_mean,
            moving_variance,
            epsilon: EPS,
            momentum: DEFAULT_MOMENTUM,
            name: name.to_string(),
        })
    }
}

impl Module for BatchNorm {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        x.batch_norm(
            &self.gamma,
            &self.beta,
            &self.moving_mean,
            &self.moving_variance,
            self.epsilon,
            self.momentum,
            &self.name,
        )
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![
            self.gamma.clone(),
            self.beta.clone(),
            self.moving_mean.clone(),
            self.moving_variance.clone(),
        ]
    }
}
