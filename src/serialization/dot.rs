//! Graphviz rendering of a graph.

use crate::asg::{Asg, Node, NodeId, NodeType};
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use std::collections::HashMap;

/// Renders `asg` in DOT format, one vertex per node labelled with its name,
/// operation and per-example shape.
///
/// Parameters and literals are omitted unless `with_leaves` is set; the
/// layer chain is easier to read without them.
pub fn to_dot(asg: &Asg, with_leaves: bool) -> String {
    let mut graph = DiGraph::<String, &str>::new();
    let mut index = HashMap::new();

    for (&id, node) in &asg.nodes {
        let keep = with_leaves || !matches!(node.node_type, NodeType::Parameter { .. } | NodeType::Literal(_));
        if keep {
            index.insert(id, graph.add_node(label(id, node)));
        }
    }

    for (id, node) in &asg.nodes {
        let Some(&to) = index.get(id) else { continue };
        for input in node.node_type.inputs() {
            if let Some(&from) = index.get(&input) {
                graph.add_edge(from, to, "");
            }
        }
    }

    format!("{}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
}

fn label(id: NodeId, node: &Node) -> String {
    let name = node.name.clone().unwrap_or_else(|| format!("#{}", id));
    match &node.shape {
        Some(shape) => format!("{}\n{} {:?}", name, node.node_type.op_name(), shape),
        None => format!("{}\n{}", name, node.node_type.op_name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{FeatureDetectionNetwork, NetworkConfig};

    #[test]
    fn test_dot_contains_layer_chain() {
        let network = FeatureDetectionNetwork::build(NetworkConfig::new("net", 16, 1, 2)).unwrap();
        let dot = to_dot(&network.graph(), false);

        assert!(dot.starts_with("digraph"));
        assert!(dot.contains(" -> "));
        assert!(dot.contains("conv1/conv2d"));
        assert!(dot.contains("output_activation"));
        assert!(!dot.contains("conv1/conv2d.weight"));
    }

    #[test]
    fn test_dot_with_leaves() {
        let network = FeatureDetectionNetwork::build(NetworkConfig::new("net", 16, 1, 2)).unwrap();
        let dot = to_dot(&network.graph(), true);

        assert!(dot.contains("conv1/conv2d.weight"));
        assert!(dot.contains("output_fc.weights"));
    }
}
