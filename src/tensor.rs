//! Module defining `Tensor` and `GraphContext`.
//!
//! `Tensor` is not a data container. It is a lightweight symbolic handle on a
//! node of the abstract semantic graph (ASG), plus the per-example shape of
//! that node.
//!
//! Operations on tensors (`conv2d`, `dot`, ...) do not compute anything: each
//! one checks its inputs against the shape rules, and only then appends the
//! corresponding node to the graph. A failed check leaves the graph untouched.
//!
//! `GraphContext` owns the graph under construction.

use crate::analysis::shape_inference::ShapeInference;
use crate::asg::{Activation, Asg, NodeId, NodeType, Padding, Shape, Value};
use crate::error::{ConfigError, Result};
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Whether a graph is assembled for training or for inference.
///
/// Only dropout depends on it: an inference graph carries no dropout nodes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Training,
    Inference,
}

/// Context that owns and drives the construction of one ASG.
///
/// Wrapped in `Rc<RefCell<>>` so that all `Tensor` handles of one graph can
/// share it. Independent graphs use independent contexts.
#[derive(Debug, Clone)]
pub struct GraphContext {
    main_graph: Asg,
    phase: Phase,
}

impl GraphContext {
    /// Creates an empty context for a training graph.
    pub fn new() -> Self {
        Self::with_phase(Phase::Training)
    }

    pub fn with_phase(phase: Phase) -> Self {
        Self {
            main_graph: Asg::new(0, Some("main".to_string())),
            phase,
        }
    }

    /// Shortcut for the `Rc<RefCell<_>>` form every `Tensor` expects.
    pub fn shared(phase: Phase) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::with_phase(phase)))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Mutable access to the main graph for building it.
    pub fn main_graph_mut(&mut self) -> &mut Asg {
        &mut self.main_graph
    }

    /// Immutable access to the main graph.
    pub fn main_graph(&self) -> &Asg {
        &self.main_graph
    }
}

impl Default for GraphContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Symbolic handle representing a node in the computation graph (ASG).
///
/// Holds the node ID, the node's shape (without the batch axis) and a
/// reference to the `GraphContext` in which the node exists.
#[derive(Debug, Clone)]
pub struct Tensor {
    /// ID of the node in the ASG.
    pub node_id: NodeId,
    shape: Shape,
    /// Shared reference to the context in which the graph is being built.
    pub context: Rc<RefCell<GraphContext>>,
}

impl Tensor {
    /// Creates an input placeholder and registers it as a graph input.
    pub fn new_input(context: &Rc<RefCell<GraphContext>>, name: &str, shape: Shape) -> Result<Self> {
        if let Some(&zero) = shape.iter().find(|&&d| d == 0) {
            return Err(ConfigError::NonPositive { field: "input dimension", value: zero }.into());
        }
        let node_type = NodeType::Input { name: name.to_string(), shape };
        let tensor = Self::insert(context, Some(name), node_type)?;
        context.borrow_mut().main_graph_mut().inputs.push(tensor.node_id);
        Ok(tensor)
    }

    /// Creates a parameter (a weight owned by a layer).
    ///
    /// `trainable` is false for statistics such as batch-norm moving averages.
    pub fn new_parameter(
        context: &Rc<RefCell<GraphContext>>,
        name: &str,
        shape: Shape,
        trainable: bool,
    ) -> Result<Self> {
        if let Some(&zero) = shape.iter().find(|&&d| d == 0) {
            return Err(ConfigError::NonPositive { field: "parameter dimension", value: zero }.into());
        }
        let node_type = NodeType::Parameter { name: name.to_string(), shape, trainable };
        Self::insert(context, Some(name), node_type)
    }

    /// Creates a constant node whose data is embedded in the graph.
    pub fn new_literal(context: &Rc<RefCell<GraphContext>>, value: Value, name: &str) -> Result<Self> {
        Self::insert(context, Some(name), NodeType::Literal(value))
    }

    fn insert(context: &Rc<RefCell<GraphContext>>, name: Option<&str>, node_type: NodeType) -> Result<Self> {
        let mut ctx = context.borrow_mut();
        let graph = ctx.main_graph_mut();

        let shape = ShapeInference::infer_node_shape(graph, &node_type)?;
        let node_id = graph.add_node(name.map(str::to_string), node_type, Some(shape.clone()))?;

        Ok(Self { node_id, shape, context: Rc::clone(context) })
    }

    /// Appends a node that reads from `self` (and possibly other tensors of the same graph).
    fn push(&self, name: &str, node_type: NodeType) -> Result<Self> {
        Self::insert(&self.context, Some(name), node_type)
    }

    /// Per-example shape; the batch axis is not included.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Tensor rank, counting the dynamic batch axis.
    pub fn rank(&self) -> usize {
        self.shape.len() + 1
    }

    /// Stable name of the underlying node, if it has one.
    pub fn name(&self) -> Option<String> {
        let ctx = self.context.borrow();
        ctx.main_graph().get_node(self.node_id).ok().and_then(|n| n.name.clone())
    }

    pub fn phase(&self) -> Phase {
        self.context.borrow().phase()
    }

    // --- Spatial operations ---

    pub fn conv2d(
        &self,
        weight: &Tensor,
        bias: Option<&Tensor>,
        stride: usize,
        padding: Padding,
        name: &str,
    ) -> Result<Self> {
        self.push(
            name,
            NodeType::Conv2d {
                input: self.node_id,
                weight: weight.node_id,
                bias: bias.map(|b| b.node_id),
                stride,
                padding,
            },
        )
    }

    pub fn conv_transpose2d(
        &self,
        weight: &Tensor,
        bias: Option<&Tensor>,
        stride: usize,
        padding: Padding,
        name: &str,
    ) -> Result<Self> {
        self.push(
            name,
            NodeType::ConvTranspose2d {
                input: self.node_id,
                weight: weight.node_id,
                bias: bias.map(|b| b.node_id),
                stride,
                padding,
            },
        )
    }

    pub fn max_pool2d(&self, pool_size: usize, stride: usize, padding: Padding, name: &str) -> Result<Self> {
        self.push(name, NodeType::MaxPool2d { input: self.node_id, pool_size, stride, padding })
    }

    // --- Normalization, activations and regularization ---

    #[allow(clippy::too_many_arguments)]
    pub fn batch_norm(
        &self,
        gamma: &Tensor,
        beta: &Tensor,
        moving_mean: &Tensor,
        moving_variance: &Tensor,
        epsilon: f32,
        momentum: f32,
        name: &str,
    ) -> Result<Self> {
        self.push(
            name,
            NodeType::BatchNorm {
                input: self.node_id,
                gamma: gamma.node_id,
                beta: beta.node_id,
                moving_mean: moving_mean.node_id,
                moving_variance: moving_variance.node_id,
                epsilon,
                momentum,
            },
        )
    }

    pub fn activation(&self, kind: Activation, name: &str) -> Result<Self> {
        self.push(name, NodeType::Activation { input: self.node_id, kind })
    }

    /// Records dropout in training graphs; inference graphs get `self` back.
    pub fn dropout(&self, keep_probability: f32, name: &str) -> Result<Self> {
        if !(keep_probability > 0.0 && keep_probability <= 1.0) {
            return Err(ConfigError::InvalidKeepProbability(keep_probability).into());
        }
        match self.phase() {
            Phase::Inference => Ok(self.clone()),
            Phase::Training => {
                self.push(name, NodeType::Dropout { input: self.node_id, keep_probability })
            }
        }
    }

    // --- Linear algebra ---

    pub fn dot(&self, other: &Tensor, name: &str) -> Result<Self> {
        self.push(name, NodeType::MatrixMultiply(self.node_id, other.node_id))
    }

    pub fn add(&self, other: &Tensor, name: &str) -> Result<Self> {
        self.push(name, NodeType::Add(self.node_id, other.node_id))
    }

    // --- Transformations ---

    /// Reshapes to `shape`; the target is stored as an index literal `<name>.shape`.
    pub fn reshape(&self, shape: Shape, name: &str) -> Result<Self> {
        let dims = Array1::from_vec(shape).into_dyn();
        let target = Tensor::new_literal(&self.context, Value::Indices(dims), &format!("{}.shape", name))?;
        self.push(name, NodeType::Reshape(self.node_id, target.node_id))
    }

    /// Collapses every non-batch axis into one, giving a rank-2 tensor.
    pub fn flatten(&self, name: &str) -> Result<Self> {
        let features = self.shape.iter().product();
        self.reshape(vec![features], name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_input_is_registered() {
        let context = GraphContext::shared(Phase::Training);
        let x = Tensor::new_input(&context, "input", vec![32, 32, 3]).unwrap();

        assert_eq!(x.shape(), &[32, 32, 3]);
        assert_eq!(x.rank(), 4);
        assert_eq!(x.name().as_deref(), Some("input"));
        assert_eq!(context.borrow().main_graph().inputs, vec![x.node_id]);
    }

    #[test]
    fn test_failed_op_leaves_graph_untouched() {
        let context = GraphContext::shared(Phase::Training);
        let x = Tensor::new_input(&context, "input", vec![4, 4, 3]).unwrap();
        let before = context.borrow().main_graph().nodes.len();

        let err = x.max_pool2d(5, 1, Padding::Valid, "pool").unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(context.borrow().main_graph().nodes.len(), before);
    }

    #[test]
    fn test_flatten_multiplies_dimensions() {
        let context = GraphContext::shared(Phase::Training);
        let x = Tensor::new_input(&context, "input", vec![8, 8, 64]).unwrap();
        let flat = x.flatten("flatten").unwrap();

        assert_eq!(flat.shape(), &[4096]);
        assert_eq!(flat.rank(), 2);
        assert!(context.borrow().main_graph().node_by_name("flatten.shape").is_ok());
    }

    #[test]
    fn test_dropout_is_identity_at_inference() {
        let context = GraphContext::shared(Phase::Inference);
        let x = Tensor::new_input(&context, "input", vec![16]).unwrap();
        let y = x.dropout(0.5, "drop").unwrap();
        assert_eq!(y.node_id, x.node_id);
    }

    #[test]
    fn test_dropout_rejects_keep_probability_out_of_range() {
        let context = GraphContext::shared(Phase::Training);
        let x = Tensor::new_input(&context, "input", vec![16]).unwrap();
        for keep in [0.0, -0.1, 1.5, f32::NAN] {
            assert!(matches!(
                x.dropout(keep, "drop"),
                Err(Error::Config(ConfigError::InvalidKeepProbability(_)))
            ));
        }
    }

    #[test]
    fn test_zero_sized_input_is_rejected() {
        let context = GraphContext::shared(Phase::Training);
        assert!(matches!(
            Tensor::new_input(&context, "input", vec![0, 8, 3]),
            Err(Error::Config(ConfigError::NonPositive { .. }))
        ));
    }
}
