//! # Architecture assembler
//!
//! Turns a [`NetworkConfig`] into a complete feature detection graph:
//!
//! ```text
//! NetworkConfig -> validate -> "input" placeholder -> strategy (by architecture)
//!               -> features -> output head (output_fc, output_activation)
//! ```
//!
//! The finished [`FeatureDetectionNetwork`] hands out the input placeholder,
//! the output probabilities and the graph itself. Training, evaluation and
//! weight handling belong to whoever consumes it.

pub mod architecture;
pub mod config;
pub mod head;
pub mod strategies;

pub use architecture::Architecture;
pub use config::{load_config, NetworkConfig};
pub use head::{output_layer, OUTPUT_ACTIVATION, OUTPUT_FC};
pub use strategies::{Strategy, STRATEGIES};

use crate::asg::{Activation, Asg, AsgError, Node, NodeType};
use crate::error::{Error, Result};
use crate::tensor::{GraphContext, Phase, Tensor};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};

/// Name of the input placeholder node.
pub const INPUT: &str = "input";

/// Trainable and non-trainable parameter totals.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ParameterCount {
    pub trainable: usize,
    pub non_trainable: usize,
}

impl ParameterCount {
    pub fn total(&self) -> usize {
        self.trainable + self.non_trainable
    }
}

/// A built multi-label feature detection graph.
pub struct FeatureDetectionNetwork {
    config: NetworkConfig,
    context: Rc<RefCell<GraphContext>>,
    input: Tensor,
    output: Tensor,
}

impl FeatureDetectionNetwork {
    /// Builds the training graph described by `config`.
    pub fn build(config: NetworkConfig) -> Result<Self> {
        Self::build_with_phase(config, Phase::Training)
    }

    /// Builds the graph for the given phase; inference graphs carry no dropout.
    pub fn build_with_phase(config: NetworkConfig, phase: Phase) -> Result<Self> {
        config.validate()?;

        let context = GraphContext::shared(phase);
        let input = Tensor::new_input(&context, INPUT, config.input_shape())?;

        debug!(architecture = %config.architecture, ?phase, "dispatching construction strategy");
        let features = strategies::lookup(config.architecture)(&input, &config)?;
        let output = output_layer(&features, config.nb_labels)?;

        {
            let mut ctx = context.borrow_mut();
            let graph = ctx.main_graph_mut();
            graph.name = Some(config.name.clone());
            graph.set_output(output.node_id);
        }

        let network = Self { config, context, input, output };
        let params = network.parameter_count();
        info!(
            name = %network.config.name,
            architecture = %network.config.architecture,
            nodes = network.node_count(),
            trainable_params = params.trainable,
            "network built"
        );
        Ok(network)
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Input placeholder, shape `[image_size, image_size, nb_channels]`.
    pub fn input(&self) -> &Tensor {
        &self.input
    }

    /// Output probabilities, shape `[nb_labels]`.
    pub fn output(&self) -> &Tensor {
        &self.output
    }

    pub fn phase(&self) -> Phase {
        self.context.borrow().phase()
    }

    /// Snapshot of the graph, with the output registered.
    pub fn graph(&self) -> Asg {
        self.context.borrow().main_graph().clone()
    }

    pub fn node_count(&self) -> usize {
        self.context.borrow().main_graph().nodes.len()
    }

    /// Looks up a node by its stable name, e.g. `"conv1/activation"`.
    pub fn node_by_name(&self, name: &str) -> Result<Node> {
        let ctx = self.context.borrow();
        Ok(ctx.main_graph().node_by_name(name)?.clone())
    }

    /// Activation applied by the output head.
    pub fn output_activation(&self) -> Result<Activation> {
        let ctx = self.context.borrow();
        let node = ctx.main_graph().get_node(self.output.node_id)?;
        match node.node_type {
            NodeType::Activation { kind, .. } => Ok(kind),
            _ => Err(Error::Graph(AsgError::NameNotFound(OUTPUT_ACTIVATION.to_string()))),
        }
    }

    pub fn parameter_count(&self) -> ParameterCount {
        let ctx = self.context.borrow();
        ctx.main_graph()
            .parameters()
            .fold(ParameterCount::default(), |mut count, node| {
                if let NodeType::Parameter { shape, trainable, .. } = &node.node_type {
                    let size: usize = shape.iter().product();
                    if *trainable {
                        count.trainable += size;
                    } else {
                        count.non_trainable += size;
                    }
                }
                count
            })
    }

    /// Layer table in the spirit of a Keras model summary: one row per
    /// operation with its output shape and the parameters it reads directly.
    pub fn summary(&self) -> String {
        let ctx = self.context.borrow();
        let graph = ctx.main_graph();
        let row = |node: &str, op: &str, shape: &str, params: &str| {
            format!("{:<28} {:<16} {:<22} {:>12}\n", node, op, shape, params)
        };
        let rule = format!("{}\n", "=".repeat(81));

        let mut out = format!(
            "Network: {} (architecture: {}, {} labels)\n",
            self.config.name, self.config.architecture, self.config.nb_labels
        );
        out.push_str(&row("Node", "Operation", "Output shape", "Params"));
        out.push_str(&rule);

        for node in graph.nodes.values() {
            if matches!(node.node_type, NodeType::Parameter { .. } | NodeType::Literal(_)) {
                continue;
            }
            let params: usize = node
                .node_type
                .inputs()
                .iter()
                .filter_map(|id| graph.get_node(*id).ok())
                .filter_map(|n| match &n.node_type {
                    NodeType::Parameter { shape, .. } => Some(shape.iter().product::<usize>()),
                    _ => None,
                })
                .sum();
            let shape = node
                .shape
                .as_ref()
                .map(|s| {
                    let dims: Vec<String> = s.iter().map(|d| d.to_string()).collect();
                    format!("(None, {})", dims.join(", "))
                })
                .unwrap_or_else(|| "?".to_string());
            out.push_str(&row(
                node.name.as_deref().unwrap_or("-"),
                node.node_type.op_name(),
                &shape,
                &params.to_string(),
            ));
        }

        let count = self.parameter_count();
        out.push_str(&rule);
        out.push_str(&format!("Total params: {}\n", count.total()));
        out.push_str(&format!("Trainable params: {}\n", count.trainable));
        out.push_str(&format!("Non-trainable params: {}", count.non_trainable));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_simple() {
        let network = FeatureDetectionNetwork::build(NetworkConfig::new("net", 64, 3, 10)).unwrap();

        assert_eq!(network.input().shape(), &[64, 64, 3]);
        assert_eq!(network.output().shape(), &[10]);
        assert_eq!(network.output().name().as_deref(), Some(OUTPUT_ACTIVATION));
        assert_eq!(network.output_activation().unwrap(), Activation::Sigmoid);
        assert_eq!(network.graph().outputs, vec![network.output().node_id]);
        assert_eq!(network.graph().inputs, vec![network.input().node_id]);
    }

    #[test]
    fn test_invalid_config_fails_before_building() {
        let err = FeatureDetectionNetwork::build(NetworkConfig::new("net", 64, 0, 10)).err().unwrap();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_parameter_count_matches_layer_formulas() {
        let network = FeatureDetectionNetwork::build(NetworkConfig::new("net", 64, 3, 10)).unwrap();
        let count = network.parameter_count();

        // conv 2368 + 12832 + 18496, bn 32 + 64 + 128 + 1024, fc1 2097664, head 5130
        assert_eq!(count.trainable, 2_137_738);
        // moving statistics: 2 * (16 + 32 + 64 + 512)
        assert_eq!(count.non_trainable, 1_248);
    }

    #[test]
    fn test_summary_lists_blocks() {
        let network = FeatureDetectionNetwork::build(NetworkConfig::new("net", 32, 3, 4)).unwrap();
        let summary = network.summary();

        assert!(summary.contains("conv1/conv2d"));
        assert!(summary.contains("(None, 4, 4, 64)"));
        assert!(summary.contains("output_activation"));
        assert!(summary.ends_with("Non-trainable params: 1248"));
    }

    #[test]
    fn test_inference_graph_has_no_dropout() {
        let config = NetworkConfig::new("net", 32, 3, 4);
        let training = FeatureDetectionNetwork::build(config.clone()).unwrap();
        let inference = FeatureDetectionNetwork::build_with_phase(config, Phase::Inference).unwrap();

        assert!(training.node_by_name("fc1/dropout").is_ok());
        assert!(inference.node_by_name("fc1/dropout").is_err());
        assert_eq!(training.node_count(), inference.node_count() + 1);
    }
}
