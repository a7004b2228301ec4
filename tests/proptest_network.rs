//! Properties of the simple network over arbitrary valid configurations.

use deeposlandia::network::{FeatureDetectionNetwork, NetworkConfig};
use deeposlandia::nn::{dense, DenseBlock};
use deeposlandia::tensor::{GraphContext, Phase, Tensor};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn output_width_is_nb_labels(
        image_size in 1usize..96,
        nb_channels in 1usize..5,
        nb_labels in 1usize..128,
    ) {
        let network = FeatureDetectionNetwork::build(NetworkConfig::new("net", image_size, nb_channels, nb_labels))
            .unwrap();
        prop_assert_eq!(network.output().shape(), &[nb_labels][..]);
    }

    #[test]
    fn three_poolings_divide_by_eight(eighths in 1usize..16) {
        let image_size = eighths * 8;
        let network = FeatureDetectionNetwork::build(NetworkConfig::new("net", image_size, 3, 4)).unwrap();
        let pool3 = network.node_by_name("pool3").unwrap().shape.unwrap();
        prop_assert_eq!(pool3, vec![eighths, eighths, 64]);
    }

    #[test]
    fn poolings_round_up_in_general(image_size in 1usize..96) {
        let network = FeatureDetectionNetwork::build(NetworkConfig::new("net", image_size, 3, 4)).unwrap();
        let pool3 = network.node_by_name("pool3").unwrap().shape.unwrap();
        let expected = image_size.div_ceil(2).div_ceil(2).div_ceil(2);
        prop_assert_eq!(pool3, vec![expected, expected, 64]);
    }

    #[test]
    fn dense_block_without_dropout_is_deterministic(features in 1usize..64, depth in 1usize..64) {
        let build = || {
            let ctx = GraphContext::shared(Phase::Training);
            let x = Tensor::new_input(&ctx, "x", vec![features]).unwrap();
            dense(&x, "fc", &DenseBlock::new(depth).with_keep_probability(1.0)).unwrap();
            let graph = ctx.borrow().main_graph().clone();
            graph
        };
        prop_assert_eq!(build(), build());
    }
}
