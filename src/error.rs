//! Error types shared by graph construction, configuration and export.

use crate::analysis::shape_inference::ShapeInferenceError;
use crate::asg::{AsgError, Padding};
use crate::network::Architecture;
use thiserror::Error;

/// Invalid input caught before the offending node reaches the graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("'{field}' must be positive, got {value}")]
    NonPositive { field: &'static str, value: usize },

    #[error("learning rate must be a positive finite number, got {0}")]
    InvalidLearningRate(f32),

    #[error("keep probability must lie in (0, 1], got {0}")]
    InvalidKeepProbability(f32),

    #[error("'{op}' produces a non-positive spatial size: window {window} does not fit \
             an extent of {input} under '{padding}' padding")]
    DegenerateSpatialSize {
        op: String,
        input: usize,
        window: usize,
        padding: Padding,
    },

    #[error("unknown activation '{0}'")]
    UnknownActivation(String),

    #[error("unknown padding mode '{0}', expected 'same' or 'valid'")]
    UnknownPadding(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(ConfigError),

    #[error("architecture '{0}' is declared but not implemented yet")]
    NotImplemented(Architecture),

    #[error("shape error: {0}")]
    Shape(ShapeInferenceError),

    #[error("graph error: {0}")]
    Graph(#[from] AsgError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures fixed by correcting the configuration.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Error::NotImplemented(_))
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ShapeInferenceError> for Error {
    fn from(err: ShapeInferenceError) -> Self {
        match err {
            ShapeInferenceError::Config(config) => Error::Config(config),
            ShapeInferenceError::Graph(graph) => Error::Graph(graph),
            other => Error::Shape(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_errors_carrying_config_errors_are_unwrapped() {
        let degenerate = ConfigError::DegenerateSpatialSize {
            op: "pool".into(),
            input: 2,
            window: 3,
            padding: Padding::Valid,
        };
        let err: Error = ShapeInferenceError::Config(degenerate.clone()).into();
        assert!(err.is_configuration_error());
        assert!(matches!(err, Error::Config(c) if c == degenerate));
    }

    #[test]
    fn test_not_implemented_is_not_a_configuration_error() {
        let err = Error::NotImplemented(Architecture::Resnet);
        assert!(err.is_not_implemented());
        assert!(!err.is_configuration_error());
        assert_eq!(err.to_string(), "architecture 'resnet' is declared but not implemented yet");
    }
}
