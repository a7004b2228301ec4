//! # Graph Analysis Module
//!
//! Passes that reason about the ASG without executing it.
//!
//! ## Available Passes
//!
//! - [`ShapeInference`](shape_inference::ShapeInference): Propagates tensor shapes
//!   through the graph, detecting shape mismatches and degenerate spatial sizes.
//!
//! ## How It Works
//!
//! ```text
//! Tensor op -> shape rule -> node inserted with its shape
//! ASG (loaded from JSON) -> ShapeInference::run -> shapes re-verified
//! ```
//!
//! The rules are shared, so a graph that was valid when it was built is valid
//! when it is reloaded.

pub mod shape_inference;

pub use shape_inference::{ShapeInference, ShapeInferenceError};
