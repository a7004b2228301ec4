//! Activation layers implemented for the graph architecture.

use crate::asg::Activation;
use crate::error::{ConfigError, Result};
use crate::nn::module::Module;
use crate::tensor::Tensor;

/// Activation layer: appends one elementwise `Activation` node.
///
/// This layer has no parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationLayer {
    pub kind: Activation,
    pub name: String,
}

impl ActivationLayer {
    pub fn new(name: &str, kind: Activation) -> Self {
        Self { kind, name: name.to_string() }
    }

    /// Builds the layer from a Keras-style name such as `"relu"`.
    pub fn from_name(name: &str, activation: &str) -> std::result::Result<Self, ConfigError> {
        let kind = activation.parse().map_err(ConfigError::UnknownActivation)?;
        Ok(Self::new(name, kind))
    }
}

impl Module for ActivationLayer {
    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        inputs.activation(self.kind, &self.name)
    }

    fn parameters(&self) -> Vec<Tensor> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asg::NodeType;
    use crate::tensor::{GraphContext, Phase};

    #[test]
    fn test_activation_node_is_recorded() {
        let ctx = GraphContext::shared(Phase::Training);
        let x = Tensor::new_input(&ctx, "input", vec![10]).unwrap();
        let y = ActivationLayer::new("act", Activation::Sigmoid).forward(&x).unwrap();

        assert_eq!(y.shape(), x.shape());
        let graph = ctx.borrow().main_graph().clone();
        assert!(matches!(
            graph.get_node(y.node_id).unwrap().node_type,
            NodeType::Activation { kind: Activation::Sigmoid, .. }
        ));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(ActivationLayer::from_name("a", "tanh").unwrap().kind, Activation::Tanh);
        assert_eq!(
            ActivationLayer::from_name("a", "mish"),
            Err(ConfigError::UnknownActivation("mish".into()))
        );
    }
}
