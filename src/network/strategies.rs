//! Construction strategies, one per [`Architecture`].
//!
//! A strategy consumes the shared input placeholder and the configuration and
//! returns a feature tensor of any rank; the output head flattens it. New
//! architectures add one enum variant and one row to [`STRATEGIES`].

use crate::error::{Error, Result};
use crate::network::{Architecture, NetworkConfig};
use crate::nn::{convolution, dense, flatten, maxpool, ConvBlock, DenseBlock, PoolBlock};
use crate::tensor::Tensor;

/// Builds the feature extractor of one architecture.
pub type Strategy = fn(&Tensor, &NetworkConfig) -> Result<Tensor>;

/// Dispatch table from architecture to strategy.
pub const STRATEGIES: [(Architecture, Strategy); 9] = [
    (Architecture::Simple, simple),
    (Architecture::Vgg16, vgg16),
    (Architecture::Vgg19, vgg19),
    (Architecture::InceptionV1, inception_v1),
    (Architecture::InceptionV2, inception_v2),
    (Architecture::InceptionV3, inception_v3),
    (Architecture::InceptionV4, inception_v4),
    (Architecture::Xception, xception),
    (Architecture::Resnet, resnet),
];

/// Strategy registered for `architecture`; `simple` when none is.
pub fn lookup(architecture: Architecture) -> Strategy {
    STRATEGIES
        .iter()
        .find(|(candidate, _)| *candidate == architecture)
        .map(|(_, strategy)| *strategy)
        .unwrap_or(simple)
}

/// Keep probability of the `fc1` dense block of the simple network (drop rate 0.75).
pub const SIMPLE_KEEP_PROBABILITY: f32 = 0.25;

/// Three convolution / max-pooling stages followed by one dense block.
///
/// The filter, kernel and pooling schedule is fixed so that externally
/// trained weights stay loadable. Each stage halves the spatial size, so the
/// features reaching `flatten1` are `image_size / 8` pixels wide.
pub fn simple(x: &Tensor, _config: &NetworkConfig) -> Result<Tensor> {
    let halve = PoolBlock::new(2).with_stride(2);

    let layer = convolution(x, "conv1", &ConvBlock::new(16, 7))?;
    let layer = maxpool(&layer, "pool1", &halve)?;
    let layer = convolution(&layer, "conv2", &ConvBlock::new(32, 5))?;
    let layer = maxpool(&layer, "pool2", &halve)?;
    let layer = convolution(&layer, "conv3", &ConvBlock::new(64, 3))?;
    let layer = maxpool(&layer, "pool3", &halve)?;
    let layer = flatten(&layer, "flatten1")?;
    dense(&layer, "fc1", &DenseBlock::new(512).with_keep_probability(SIMPLE_KEEP_PROBABILITY))
}

pub fn vgg16(_x: &Tensor, _config: &NetworkConfig) -> Result<Tensor> {
    Err(Error::NotImplemented(Architecture::Vgg16))
}

pub fn vgg19(_x: &Tensor, _config: &NetworkConfig) -> Result<Tensor> {
    Err(Error::NotImplemented(Architecture::Vgg19))
}

pub fn inception_v1(_x: &Tensor, _config: &NetworkConfig) -> Result<Tensor> {
    Err(Error::NotImplemented(Architecture::InceptionV1))
}

pub fn inception_v2(_x: &Tensor, _config: &NetworkConfig) -> Result<Tensor> {
    Err(Error::NotImplemented(Architecture::InceptionV2))
}

pub fn inception_v3(_x: &Tensor, _config: &NetworkConfig) -> Result<Tensor> {
    Err(Error::NotImplemented(Architecture::InceptionV3))
}

pub fn inception_v4(_x: &Tensor, _config: &NetworkConfig) -> Result<Tensor> {
    Err(Error::NotImplemented(Architecture::InceptionV4))
}

pub fn xception(_x: &Tensor, _config: &NetworkConfig) -> Result<Tensor> {
    Err(Error::NotImplemented(Architecture::Xception))
}

pub fn resnet(_x: &Tensor, _config: &NetworkConfig) -> Result<Tensor> {
    Err(Error::NotImplemented(Architecture::Resnet))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{GraphContext, Phase};

    #[test]
    fn test_every_architecture_has_exactly_one_strategy() {
        for architecture in Architecture::ALL {
            let rows = STRATEGIES.iter().filter(|(a, _)| *a == architecture).count();
            assert_eq!(rows, 1, "{}", architecture);
        }
    }

    #[test]
    fn test_simple_reduces_by_eight() {
        let ctx = GraphContext::shared(Phase::Training);
        let config = NetworkConfig::new("net", 512, 3, 65);
        let x = Tensor::new_input(&ctx, "input", config.input_shape()).unwrap();

        let features = simple(&x, &config).unwrap();
        assert_eq!(features.shape(), &[512]);

        let graph = ctx.borrow().main_graph().clone();
        assert_eq!(graph.node_by_name("pool3").unwrap().shape, Some(vec![64, 64, 64]));
        assert_eq!(graph.node_by_name("flatten1").unwrap().shape, Some(vec![64 * 64 * 64]));
    }

    #[test]
    fn test_stubs_report_their_architecture() {
        let ctx = GraphContext::shared(Phase::Training);
        let config = NetworkConfig::new("net", 64, 3, 5);
        let x = Tensor::new_input(&ctx, "input", config.input_shape()).unwrap();

        for architecture in Architecture::ALL.into_iter().filter(|a| *a != Architecture::Simple) {
            match lookup(architecture)(&x, &config) {
                Err(Error::NotImplemented(reported)) => assert_eq!(reported, architecture),
                other => panic!("{} should not be available, got {:?}", architecture, other.map(|t| t.node_id)),
            }
        }
        // Stubs leave the graph as they found it
        assert_eq!(ctx.borrow().main_graph().nodes.len(), 1);
    }
}
