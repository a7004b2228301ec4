//! Flatten layer: collapses an image tensor into a feature vector.

use crate::error::Result;
use crate::nn::Module;
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq)]
pub struct Flatten {
    pub name: String,
}

impl Flatten {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

impl Module for Flatten {
    /// Rank-2 inputs are already flat and come back unchanged.
    fn forward(&self, inputs: &Tensor) -> Result<Tensor> {
        if inputs.rank() <= 2 {
            return Ok(inputs.clone());
        }
        inputs.flatten(&self.name)
    }

    fn parameters(&self) -> Vec<Tensor> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{GraphContext, Phase};

    #[test]
    fn test_flatten_image() {
        let ctx = GraphContext::shared(Phase::Training);
        let x = Tensor::new_input(&ctx, "input", vec![64, 64, 64]).unwrap();
        let y = Flatten::new("flatten1").forward(&x).unwrap();
        assert_eq!(y.shape(), &[262_144]);
    }

    #[test]
    fn test_flatten_is_noop_on_rank_two() {
        let ctx = GraphContext::shared(Phase::Training);
        let x = Tensor::new_input(&ctx, "input", vec![512]).unwrap();
        let y = Flatten::new("flatten1").forward(&x).unwrap();
        assert_eq!(y.node_id, x.node_id);
    }
}
