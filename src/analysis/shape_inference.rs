//! Module for shape inference (Shape Inference).
//!
//! Holds the spatial-dimension rules for every node type. The same rules are
//! used twice: eagerly, by `Tensor` operations before a node is inserted, and
//! by [`ShapeInference::run`], which re-derives every shape of a finished (or
//! deserialized) graph in topological order and checks it against the shape
//! recorded on the node.
//!
//! Shapes exclude the dynamic batch axis, so an image tensor `[N, H, W, C]` is
//! stored as `[H, W, C]`. Ranks reported in errors count the batch axis.

use crate::asg::{Asg, AsgError, Node, NodeId, NodeType, Padding, Shape, Value};
use crate::error::ConfigError;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeInferenceError {
    #[error("Graph error: {0}")]
    Graph(#[from] AsgError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Incompatible shapes for operation '{op}': left operand {shape1:?}, right operand {shape2:?}.")]
    IncompatibleShapes {
        op: String,
        shape1: Shape,
        shape2: Shape,
    },

    #[error("Invalid tensor rank for '{op}': expected {expected}D, got {actual}D.")]
    InvalidRank {
        op: String,
        expected: usize,
        actual: usize,
    },

    #[error("Shape information missing for node {0}.")]
    MissingShapeInfo(NodeId),

    #[error("Node {0} must be an index Literal holding a shape.")]
    NotALiteral(NodeId),

    #[error("Node {node} records shape {recorded:?} but its inputs imply {inferred:?}.")]
    ShapeMismatch {
        node: NodeId,
        recorded: Shape,
        inferred: Shape,
    },

    #[error("Graph contains a cycle through node {0}.")]
    Cycle(NodeId),
}

type Result<T> = std::result::Result<T, ShapeInferenceError>;

/// Output extent of a sliding window (convolution or pooling) along one axis.
///
/// `Same` keeps `ceil(input / stride)`; `Valid` keeps only full windows and
/// fails when the window does not fit at all.
pub fn window_output_size(
    op: &str,
    input: usize,
    window: usize,
    stride: usize,
    padding: Padding,
) -> Result<usize> {
    check_window(input, window, stride)?;
    match padding {
        Padding::Same => Ok(input.div_ceil(stride)),
        Padding::Valid => {
            if window > input {
                return Err(ConfigError::DegenerateSpatialSize {
                    op: op.to_string(),
                    input,
                    window,
                    padding,
                }
                .into());
            }
            Ok((input - window) / stride + 1)
        }
    }
}

/// Output extent of a transposed convolution along one axis.
pub fn transposed_output_size(
    input: usize,
    kernel: usize,
    stride: usize,
    padding: Padding,
) -> Result<usize> {
    check_window(input, kernel, stride)?;
    match padding {
        Padding::Same => Ok(input * stride),
        Padding::Valid => Ok((input - 1) * stride + kernel),
    }
}

fn check_window(input: usize, window: usize, stride: usize) -> Result<()> {
    if input == 0 {
        return Err(ConfigError::NonPositive { field: "spatial size", value: 0 }.into());
    }
    if window == 0 {
        return Err(ConfigError::NonPositive { field: "kernel_size", value: 0 }.into());
    }
    if stride == 0 {
        return Err(ConfigError::NonPositive { field: "stride", value: 0 }.into());
    }
    Ok(())
}

/// Structure that performs shape inference for ASG.
pub struct ShapeInference;

impl ShapeInference {
    /// Re-derives the shape of every node reachable from the graph outputs.
    ///
    /// Nodes without a recorded shape get one; nodes whose recorded shape
    /// disagrees with their inputs yield [`ShapeInferenceError::ShapeMismatch`].
    pub fn run(asg: &mut Asg) -> Result<()> {
        let sorted_nodes = Self::topological_sort(asg)?;

        for node_id in sorted_nodes {
            let node = asg.get_node(node_id)?;
            let inferred = Self::infer_node_shape(asg, &node.node_type)?;

            if let Some(recorded) = &node.shape {
                if *recorded != inferred {
                    return Err(ShapeInferenceError::ShapeMismatch {
                        node: node_id,
                        recorded: recorded.clone(),
                        inferred,
                    });
                }
            }
            asg.get_node_mut(node_id)?.shape = Some(inferred);
        }

        Ok(())
    }

    /// Shape of the tensor a node of type `node_type` would produce in `asg`.
    ///
    /// Every input of `node_type` must already carry a shape.
    pub fn infer_node_shape(asg: &Asg, node_type: &NodeType) -> Result<Shape> {
        match node_type {
            NodeType::Input { shape, .. } | NodeType::Parameter { shape, .. } => Ok(shape.clone()),

            NodeType::Literal(Value::Indices(arr)) => Ok(arr.shape().to_vec()),

            // Conv2d: [H, W, C_in] * [k, k, C_in, F] -> [H_out, W_out, F]
            NodeType::Conv2d { input, weight, bias, stride, padding } => {
                let input_shape = Self::get_shape(asg, *input)?;
                let weight_shape = Self::get_shape(asg, *weight)?;
                Self::expect_image("Conv2d", &input_shape)?;
                Self::expect_dims("Conv2d", &weight_shape, 4)?;

                if weight_shape[2] != input_shape[2] {
                    return Err(ShapeInferenceError::IncompatibleShapes {
                        op: "Conv2d".to_string(),
                        shape1: input_shape,
                        shape2: weight_shape,
                    });
                }
                let filters = weight_shape[3];
                Self::check_bias(asg, "Conv2d", *bias, filters)?;

                let out_h = window_output_size("Conv2d", input_shape[0], weight_shape[0], *stride, *padding)?;
                let out_w = window_output_size("Conv2d", input_shape[1], weight_shape[1], *stride, *padding)?;
                Ok(vec![out_h, out_w, filters])
            }

            // ConvTranspose2d: [H, W, C_in] * [k, k, F, C_in] -> [H_out, W_out, F]
            NodeType::ConvTranspose2d { input, weight, bias, stride, padding } => {
                let input_shape = Self::get_shape(asg, *input)?;
                let weight_shape = Self::get_shape(asg, *weight)?;
                Self::expect_image("ConvTranspose2d", &input_shape)?;
                Self::expect_dims("ConvTranspose2d", &weight_shape, 4)?;

                if weight_shape[3] != input_shape[2] {
                    return Err(ShapeInferenceError::IncompatibleShapes {
                        op: "ConvTranspose2d".to_string(),
                        shape1: input_shape,
                        shape2: weight_shape,
                    });
                }
                let filters = weight_shape[2];
                Self::check_bias(asg, "ConvTranspose2d", *bias, filters)?;

                let out_h = transposed_output_size(input_shape[0], weight_shape[0], *stride, *padding)?;
                let out_w = transposed_output_size(input_shape[1], weight_shape[1], *stride, *padding)?;
                Ok(vec![out_h, out_w, filters])
            }

            NodeType::MaxPool2d { input, pool_size, stride, padding } => {
                let input_shape = Self::get_shape(asg, *input)?;
                Self::expect_image("MaxPool2d", &input_shape)?;

                let out_h = window_output_size("MaxPool2d", input_shape[0], *pool_size, *stride, *padding)?;
                let out_w = window_output_size("MaxPool2d", input_shape[1], *pool_size, *stride, *padding)?;
                Ok(vec![out_h, out_w, input_shape[2]])
            }

            NodeType::BatchNorm { input, gamma, beta, moving_mean, moving_variance, .. } => {
                let input_shape = Self::get_shape(asg, *input)?;
                let features = *input_shape.last().ok_or_else(|| ShapeInferenceError::InvalidRank {
                    op: "BatchNorm".to_string(),
                    expected: 2,
                    actual: 1,
                })?;
                for stat in [gamma, beta, moving_mean, moving_variance] {
                    let stat_shape = Self::get_shape(asg, *stat)?;
                    if stat_shape != [features] {
                        return Err(ShapeInferenceError::IncompatibleShapes {
                            op: "BatchNorm".to_string(),
                            shape1: input_shape,
                            shape2: stat_shape,
                        });
                    }
                }
                Ok(input_shape)
            }

            // Elementwise - shape unchanged
            NodeType::Activation { input, .. } | NodeType::Dropout { input, .. } => {
                Self::get_shape(asg, *input)
            }

            NodeType::Reshape(data_id, shape_id) => {
                let data_shape = Self::get_shape(asg, *data_id)?;
                let shape_node = asg.get_node(*shape_id)?;
                let NodeType::Literal(Value::Indices(dims)) = &shape_node.node_type else {
                    return Err(ShapeInferenceError::NotALiteral(*shape_id));
                };
                let new_shape: Shape = dims.iter().copied().collect();

                if new_shape.iter().product::<usize>() != data_shape.iter().product::<usize>() {
                    return Err(ShapeInferenceError::IncompatibleShapes {
                        op: "Reshape".to_string(),
                        shape1: data_shape,
                        shape2: new_shape,
                    });
                }
                Ok(new_shape)
            }

            // [in] x [in, out] -> [out]
            NodeType::MatrixMultiply(l, r) => {
                let ls = Self::get_shape(asg, *l)?;
                let rs = Self::get_shape(asg, *r)?;
                Self::expect_rank("MatrixMultiply", &ls, 2)?;
                Self::expect_dims("MatrixMultiply", &rs, 2)?;

                if ls[0] != rs[0] {
                    return Err(ShapeInferenceError::IncompatibleShapes {
                        op: "MatrixMultiply".to_string(),
                        shape1: ls,
                        shape2: rs,
                    });
                }
                Ok(vec![rs[1]])
            }

            NodeType::Add(l, r) => {
                let ls = Self::get_shape(asg, *l)?;
                let rs = Self::get_shape(asg, *r)?;
                if ls != rs {
                    return Err(ShapeInferenceError::IncompatibleShapes {
                        op: "Add".to_string(),
                        shape1: ls,
                        shape2: rs,
                    });
                }
                Ok(ls)
            }
        }
    }

    /// Helper function to get an already computed shape for a node.
    fn get_shape(asg: &Asg, node_id: NodeId) -> Result<Shape> {
        let node = asg.get_node(node_id)?;
        node.shape.clone().ok_or(ShapeInferenceError::MissingShapeInfo(node_id))
    }

    /// `expected` counts the batch axis, like the ranks in error messages.
    fn expect_rank(op: &str, shape: &[usize], expected: usize) -> Result<()> {
        if shape.len() + 1 != expected {
            return Err(ShapeInferenceError::InvalidRank {
                op: op.to_string(),
                expected,
                actual: shape.len() + 1,
            });
        }
        Ok(())
    }

    /// Parameters have no batch axis: `expected` is their plain dimension count.
    fn expect_dims(op: &str, shape: &[usize], expected: usize) -> Result<()> {
        if shape.len() != expected {
            return Err(ShapeInferenceError::InvalidRank {
                op: op.to_string(),
                expected,
                actual: shape.len(),
            });
        }
        Ok(())
    }

    fn expect_image(op: &str, shape: &[usize]) -> Result<()> {
        Self::expect_rank(op, shape, 4)
    }

    fn check_bias(asg: &Asg, op: &str, bias: Option<NodeId>, filters: usize) -> Result<()> {
        if let Some(bias) = bias {
            let bias_shape = Self::get_shape(asg, bias)?;
            if bias_shape != [filters] {
                return Err(ShapeInferenceError::IncompatibleShapes {
                    op: op.to_string(),
                    shape1: vec![filters],
                    shape2: bias_shape,
                });
            }
        }
        Ok(())
    }

    /// Performs topological sort of the graph.
    /// Returns the IDs of all nodes reachable from the outputs, inputs first.
    pub fn topological_sort(asg: &Asg) -> Result<Vec<NodeId>> {
        let mut sorted = Vec::new();
        let mut visited = HashSet::new();
        let mut in_progress = HashSet::new();
        for output_id in &asg.outputs {
            Self::build_sorted_graph(*output_id, asg, &mut visited, &mut in_progress, &mut sorted)?;
        }
        Ok(sorted)
    }

    fn build_sorted_graph(
        node_id: NodeId,
        asg: &Asg,
        visited: &mut HashSet<NodeId>,
        in_progress: &mut HashSet<NodeId>,
        sorted: &mut Vec<NodeId>,
    ) -> Result<()> {
        if visited.contains(&node_id) {
            return Ok(());
        }
        if !in_progress.insert(node_id) {
            return Err(ShapeInferenceError::Cycle(node_id));
        }

        let node: &Node = asg.get_node(node_id)?;
        for input_id in node.node_type.inputs() {
            Self::build_sorted_graph(input_id, asg, visited, in_progress, sorted)?;
        }

        in_progress.remove(&node_id);
        visited.insert(node_id);
        sorted.push(node_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_padding_keeps_size_at_stride_one() {
        for kernel in [2, 3, 4, 7] {
            assert_eq!(window_output_size("conv", 512, kernel, 1, Padding::Same), Ok(512));
        }
    }

    #[test]
    fn test_same_padding_rounds_up() {
        assert_eq!(window_output_size("pool", 512, 2, 2, Padding::Same), Ok(256));
        assert_eq!(window_output_size("pool", 7, 2, 2, Padding::Same), Ok(4));
    }

    #[test]
    fn test_valid_padding_shrinks_by_kernel_minus_one() {
        assert_eq!(window_output_size("conv", 32, 5, 1, Padding::Valid), Ok(28));
        assert_eq!(window_output_size("conv", 5, 5, 1, Padding::Valid), Ok(1));
    }

    #[test]
    fn test_valid_padding_rejects_oversized_windows() {
        let err = window_output_size("pool", 4, 5, 1, Padding::Valid).unwrap_err();
        assert_eq!(
            err,
            ShapeInferenceError::Config(ConfigError::DegenerateSpatialSize {
                op: "pool".into(),
                input: 4,
                window: 5,
                padding: Padding::Valid,
            })
        );
    }

    #[test]
    fn test_zero_stride_is_rejected() {
        assert!(matches!(
            window_output_size("pool", 8, 2, 0, Padding::Same),
            Err(ShapeInferenceError::Config(ConfigError::NonPositive { field: "stride", .. }))
        ));
    }

    #[test]
    fn test_transposed_sizes() {
        assert_eq!(transposed_output_size(16, 3, 2, Padding::Same), Ok(32));
        assert_eq!(transposed_output_size(16, 3, 1, Padding::Valid), Ok(18));
    }

    #[test]
    fn test_run_fills_and_checks_shapes() {
        let mut asg = Asg::new(0, None);
        let x = asg
            .add_node(Some("x".into()), NodeType::Input { name: "x".into(), shape: vec![8, 8, 3] }, None)
            .unwrap();
        let pool = asg
            .add_node(
                None,
                NodeType::MaxPool2d { input: x, pool_size: 2, stride: 2, padding: Padding::Same },
                None,
            )
            .unwrap();
        asg.set_output(pool);

        ShapeInference::run(&mut asg).unwrap();
        assert_eq!(asg.get_node(pool).unwrap().shape, Some(vec![4, 4, 3]));

        asg.get_node_mut(pool).unwrap().shape = Some(vec![8, 8, 3]);
        assert!(matches!(
            ShapeInference::run(&mut asg),
            Err(ShapeInferenceError::ShapeMismatch { node, .. }) if node == pool
        ));
    }

    #[test]
    fn test_pooling_requires_image_rank() {
        let mut asg = Asg::new(0, None);
        let x = asg
            .add_node(None, NodeType::Input { name: "x".into(), shape: vec![10] }, Some(vec![10]))
            .unwrap();
        let pool = NodeType::MaxPool2d { input: x, pool_size: 2, stride: 2, padding: Padding::Same };
        assert_eq!(
            ShapeInference::infer_node_shape(&asg, &pool),
            Err(ShapeInferenceError::InvalidRank { op: "MaxPool2d".into(), expected: 4, actual: 2 })
        );
    }
}
