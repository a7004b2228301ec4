//! Module implementing the fully-connected (linear) layer in the graph paradigm.

use crate::error::{ConfigError, Result};
use crate::nn::module::Module;
use crate::tensor::{GraphContext, Tensor};
use std::cell::RefCell;
use std::rc::Rc;

/// Fully-connected (linear) layer.
///
/// In the graph architecture this layer holds no data. It owns the symbolic
/// `Tensor` handles of its weights (`[in_features, out_features]`) and bias
/// (`[out_features]`), registered as `Parameter` nodes in the ASG.
///
/// `forward` adds the operations for `y = xW + b`: a `MatrixMultiply` node
/// named `<name>.matmul` followed by an `Add` node named `<name>`.
pub struct Linear {
    /// Symbolic handle for the weight tensor.
    pub weights: Tensor,
    /// Symbolic handle for the bias tensor.
    pub bias: Tensor,
    pub name: String,
}

impl Linear {
    /// Creates a new fully-connected layer, registering its parameters in the graph.
    ///
    /// # Arguments
    ///
    /// * `context` - Reference to the `GraphContext` the graph is built in.
    /// * `name` - Base name, so that the parameters get unique names
    ///   (e.g. "fc1/dense.weights", "fc1/dense.bias").
    /// * `in_features` - Number of input features.
    /// * `out_features` - Number of output features.
    pub fn new(
        context: &Rc<RefCell<GraphContext>>,
        name: &str,
        in_features: usize,
        out_features: usize,
    ) -> Result<Self> {
        if out_features == 0 {
            return Err(ConfigError::NonPositive { field: "depth", value: out_features }.into());
        }
        let weights_name = format!("{}.weights", name);
        let bias_name = format!("{}.bias", name);

        let weights = Tensor::new_parameter(context, &weights_name, vec![in_features, out_features], true)?;
        let bias = Tensor::new_parameter(context, &bias_name, vec![out_features], true)?;

        Ok(Self { weights, bias, name: name.to_string() })
    }
}

impl Module for Linear {
    /// Adds the forward pass `inputs.dot(weights) + bias` to the graph.
    ///
    /// `inputs` must be rank 2; flatten image tensors first.
    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        let dot_product = inputs.dot(&self.weights, &format!("{}.matmul", self.name))?;
        dot_product.add(&self.bias, &self.name)
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![self.weights.clone(), self.bias.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::tensor::Phase;

    #[test]
    fn test_linear_forward() {
        let context = GraphContext::shared(Phase::Training);
        let input = Tensor::new_input(&context, "input", vec![784]).unwrap();
        let linear = Linear::new(&context, "fc1", 784, 128).unwrap();

        let output = linear.forward(&input).unwrap();
        assert_eq!(output.shape(), &[128]);
        assert_eq!(output.name().as_deref(), Some("fc1"));
        assert_eq!(linear.parameters().len(), 2);
    }

    #[test]
    fn test_linear_rejects_image_input() {
        let context = GraphContext::shared(Phase::Training);
        let input = Tensor::new_input(&context, "input", vec![4, 4, 2]).unwrap();
        let linear = Linear::new(&context, "fc1", 32, 8).unwrap();

        assert!(matches!(linear.forward(&input), Err(Error::Shape(_))));
    }
}
