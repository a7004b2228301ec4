//! ASG: the abstract semantic graph that a network is assembled into.
//!
//! The graph is purely descriptive. Nodes record which operation produces a
//! tensor, which nodes feed it and the per-example shape of the result; no
//! tensor data lives here apart from small literals (reshape targets).

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Node identifier.
pub type NodeId = usize;
/// Graph identifier.
pub type AsgId = usize;
/// Per-example tensor shape. The leading batch axis is dynamic and never stored.
pub type Shape = Vec<usize>;

pub type AsgResult<T> = std::result::Result<T, AsgError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsgError {
    #[error("node with ID {0} not found")]
    NodeNotFound(NodeId),
    #[error("no node is named '{0}'")]
    NameNotFound(String),
    #[error("node name '{0}' is already taken")]
    DuplicateName(String),
}

/// Border policy of convolution and pooling windows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    /// Pads the borders so that only the stride changes the spatial size.
    Same,
    /// Windows only cover real pixels, so the spatial size shrinks.
    Valid,
}

impl Padding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Padding::Same => "same",
            Padding::Valid => "valid",
        }
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Padding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "same" => Ok(Padding::Same),
            "valid" => Ok(Padding::Valid),
            other => Err(other.to_string()),
        }
    }
}

/// Elementwise nonlinearity applied at the end of a block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Softmax,
    Tanh,
    /// Identity.
    Linear,
}

impl Activation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Softmax => "softmax",
            Activation::Tanh => "tanh",
            Activation::Linear => "linear",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Activation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "softmax" => Ok(Activation::Softmax),
            "tanh" => Ok(Activation::Tanh),
            "linear" => Ok(Activation::Linear),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node ID (duplicates the map key for convenience).
    pub id: NodeId,
    pub name: Option<String>,
    pub node_type: NodeType,
    pub shape: Option<Shape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeType {
    // Data
    Input { name: String, shape: Shape },
    Parameter { name: String, shape: Shape, trainable: bool },
    Literal(Value),

    // Spatial
    Conv2d {
        input: NodeId,
        weight: NodeId,
        bias: Option<NodeId>,
        stride: usize,
        padding: Padding,
    },
    ConvTranspose2d {
        input: NodeId,
        weight: NodeId,
        bias: Option<NodeId>,
        stride: usize,
        padding: Padding,
    },
    MaxPool2d {
        input: NodeId,
        pool_size: usize,
        stride: usize,
        padding: Padding,
    },

    // Normalization over the last (channel / feature) axis
    BatchNorm {
        input: NodeId,
        gamma: NodeId,
        beta: NodeId,
        moving_mean: NodeId,
        moving_variance: NodeId,
        epsilon: f32,
        momentum: f32,
    },

    Activation { input: NodeId, kind: Activation },

    // Second argument is an index literal holding the target shape
    Reshape(NodeId, NodeId),
    MatrixMultiply(NodeId, NodeId),
    Add(NodeId, NodeId),

    /// Zeroes units with probability `1 - keep_probability` while training.
    Dropout { input: NodeId, keep_probability: f32 },
}

impl NodeType {
    /// IDs of the nodes this node reads from, in argument order.
    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            NodeType::Input { .. } | NodeType::Parameter { .. } | NodeType::Literal(_) => vec![],
            NodeType::Conv2d { input, weight, bias, .. }
            | NodeType::ConvTranspose2d { input, weight, bias, .. } => {
                let mut deps = vec![*input, *weight];
                if let Some(b) = bias {
                    deps.push(*b);
                }
                deps
            }
            NodeType::MaxPool2d { input, .. } => vec![*input],
            NodeType::BatchNorm { input, gamma, beta, moving_mean, moving_variance, .. } => {
                vec![*input, *gamma, *beta, *moving_mean, *moving_variance]
            }
            NodeType::Activation { input, .. } | NodeType::Dropout { input, .. } => vec![*input],
            NodeType::Reshape(a, b) | NodeType::MatrixMultiply(a, b) | NodeType::Add(a, b) => {
                vec![*a, *b]
            }
        }
    }

    /// Short operation label used by summaries and graph renderings.
    pub fn op_name(&self) -> &'static str {
        match self {
            NodeType::Input { .. } => "Input",
            NodeType::Parameter { .. } => "Parameter",
            NodeType::Literal(_) => "Literal",
            NodeType::Conv2d { .. } => "Conv2d",
            NodeType::ConvTranspose2d { .. } => "ConvTranspose2d",
            NodeType::MaxPool2d { .. } => "MaxPool2d",
            NodeType::BatchNorm { .. } => "BatchNorm",
            NodeType::Activation { .. } => "Activation",
            NodeType::Reshape(..) => "Reshape",
            NodeType::MatrixMultiply(..) => "MatrixMultiply",
            NodeType::Add(..) => "Add",
            NodeType::Dropout { .. } => "Dropout",
        }
    }

    /// Whether the node carries data rather than computing it.
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeType::Input { .. } | NodeType::Parameter { .. } | NodeType::Literal(_))
    }
}

/// Constant data embedded in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Exact non-negative integers, such as the target shape of a reshape.
    Indices(ArrayD<usize>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asg {
    pub id: AsgId,
    pub name: Option<String>,
    pub nodes: BTreeMap<NodeId, Node>,
    pub inputs: Vec<NodeId>,
    pub outputs: Vec<NodeId>,
}

impl Asg {
    pub fn new(id: AsgId, name: Option<String>) -> Self {
        Self { id, name, nodes: BTreeMap::new(), inputs: vec![], outputs: vec![] }
    }

    /// Appends a node. Named nodes must have a name unique within the graph.
    pub fn add_node(
        &mut self,
        name: Option<String>,
        node_type: NodeType,
        shape: Option<Shape>,
    ) -> AsgResult<NodeId> {
        if let Some(name) = &name {
            if self.find_by_name(name).is_some() {
                return Err(AsgError::DuplicateName(name.clone()));
            }
        }

        let new_id = self.nodes.len();
        let node = Node { id: new_id, name, node_type, shape };
        self.nodes.insert(new_id, node);
        Ok(new_id)
    }

    pub fn set_outputs(&mut self, outputs: Vec<NodeId>) {
        self.outputs = outputs;
    }

    pub fn set_output(&mut self, output: NodeId) {
        self.set_outputs(vec![output]);
    }

    pub fn get_node(&self, id: NodeId) -> AsgResult<&Node> {
        self.nodes.get(&id).ok_or(AsgError::NodeNotFound(id))
    }
    pub fn get_node_mut(&mut self, id: NodeId) -> AsgResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(AsgError::NodeNotFound(id))
    }

    fn find_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name.as_deref() == Some(name))
    }

    /// Looks a node up by its stable name (e.g. `"output_activation"`).
    pub fn node_by_name(&self, name: &str) -> AsgResult<&Node> {
        self.find_by_name(name).ok_or_else(|| AsgError::NameNotFound(name.to_string()))
    }

    /// All `Parameter` nodes in insertion order.
    pub fn parameters(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| matches!(n.node_type, NodeType::Parameter { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_node_assigns_sequential_ids() {
        let mut asg = Asg::new(0, None);
        let a = asg
            .add_node(Some("x".into()), NodeType::Input { name: "x".into(), shape: vec![4] }, Some(vec![4]))
            .unwrap();
        let b = asg.add_node(None, NodeType::Activation { input: a, kind: Activation::Relu }, None).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(asg.get_node(b).unwrap().node_type.inputs(), vec![a]);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let mut asg = Asg::new(0, None);
        let input = NodeType::Input { name: "x".into(), shape: vec![4] };
        asg.add_node(Some("x".into()), input.clone(), None).unwrap();
        assert_eq!(
            asg.add_node(Some("x".into()), input, None),
            Err(AsgError::DuplicateName("x".into()))
        );
    }

    #[test]
    fn test_node_by_name() {
        let mut asg = Asg::new(0, None);
        asg.add_node(Some("x".into()), NodeType::Input { name: "x".into(), shape: vec![4] }, None)
            .unwrap();
        assert_eq!(asg.node_by_name("x").unwrap().id, 0);
        assert_eq!(asg.node_by_name("y"), Err(AsgError::NameNotFound("y".into())));
    }

    #[test]
    fn test_parse_padding_and_activation() {
        assert_eq!("SAME".parse::<Padding>(), Ok(Padding::Same));
        assert_eq!("valid".parse::<Padding>(), Ok(Padding::Valid));
        assert!("reflect".parse::<Padding>().is_err());
        assert_eq!("sigmoid".parse::<Activation>(), Ok(Activation::Sigmoid));
        assert_eq!(Activation::Relu.to_string(), "relu");
        assert!("swish".parse::<Activation>().is_err());
    }
}
