//! # Deeposlandia: feature detection networks as symbolic graphs
//!
//! Assembles convolutional multi-label classifiers into an **Abstract
//! Semantic Graph (ASG)**. Every layer is a node with a statically known
//! per-example shape; nothing is executed here. Training, evaluation and
//! weight storage are left to whatever backend consumes the graph.
//!
//! ## Usage Example
//!
//! ```no_run
//! use deeposlandia::network::{Architecture, FeatureDetectionNetwork, NetworkConfig};
//!
//! let config = NetworkConfig::new("shapes", 64, 3, 10).with_architecture(Architecture::Simple);
//! let network = FeatureDetectionNetwork::build(config)?;
//!
//! assert_eq!(network.output().shape(), &[10]);
//! println!("{}", network.summary());
//! # Ok::<(), deeposlandia::Error>(())
//! ```
//!
//! Lower-level building blocks live in [`nn`]: layers implementing
//! [`nn::Module`] and the composite convolution, transposed convolution,
//! pooling and dense blocks the architectures are made of.

pub mod analysis;
pub mod asg;
pub mod error;
pub mod network;
pub mod nn;
pub mod serialization;
pub mod tensor;

pub use error::{ConfigError, Error, Result};
pub use network::{Architecture, FeatureDetectionNetwork, NetworkConfig};
