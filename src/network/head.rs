//! Multi-label output head shared by every architecture.

use crate::asg::Activation;
use crate::error::Result;
use crate::nn::{flatten, ActivationLayer, Linear, Module};
use crate::tensor::Tensor;

/// Name of the fully-connected projection of the head.
pub const OUTPUT_FC: &str = "output_fc";
/// Name of the output probabilities.
pub const OUTPUT_ACTIVATION: &str = "output_activation";
/// Labels are independent memberships, hence sigmoid and never softmax.
pub const OUTPUT_ACTIVATION_KIND: Activation = Activation::Sigmoid;

/// Projects `x` onto `nb_labels` units followed by an elementwise sigmoid.
///
/// Features of rank above 2 are flattened first (`output_flatten`).
pub fn output_layer(x: &Tensor, nb_labels: usize) -> Result<Tensor> {
    let x = flatten(x, "output_flatten")?;
    let in_features = x.shape().last().copied().unwrap_or(1);

    let y = Linear::new(&x.context, OUTPUT_FC, in_features, nb_labels)?.forward(&x)?;
    ActivationLayer::new(OUTPUT_ACTIVATION, OUTPUT_ACTIVATION_KIND).forward(&y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asg::NodeType;
    use crate::tensor::{GraphContext, Phase};

    #[test]
    fn test_head_width_and_names() {
        let ctx = GraphContext::shared(Phase::Training);
        let x = Tensor::new_input(&ctx, "features", vec![512]).unwrap();
        let y = output_layer(&x, 65).unwrap();

        assert_eq!(y.shape(), &[65]);
        assert_eq!(y.rank(), 2);
        let graph = ctx.borrow().main_graph().clone();
        assert_eq!(graph.node_by_name(OUTPUT_FC).unwrap().shape, Some(vec![65]));
        assert!(matches!(
            graph.node_by_name(OUTPUT_ACTIVATION).unwrap().node_type,
            NodeType::Activation { kind: Activation::Sigmoid, .. }
        ));
    }

    #[test]
    fn test_head_flattens_image_features() {
        let ctx = GraphContext::shared(Phase::Training);
        let x = Tensor::new_input(&ctx, "features", vec![4, 4, 8]).unwrap();
        let y = output_layer(&x, 3).unwrap();

        assert_eq!(y.shape(), &[3]);
        let graph = ctx.borrow().main_graph().clone();
        assert_eq!(graph.node_by_name("output_fc.weights").unwrap().shape, Some(vec![128, 3]));
    }
}
