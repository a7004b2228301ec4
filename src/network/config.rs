//! Network configuration.
//!
//! A [`NetworkConfig`] is created once per run and passed, read-only, to every
//! construction step. It can be built in code or loaded from JSON:
//!
//! ```json
//! {
//!   "name": "mapillary",
//!   "image_size": 512,
//!   "nb_channels": 3,
//!   "nb_labels": 65,
//!   "learning_rate": 0.0001,
//!   "architecture": "simple"
//! }
//! ```
//!
//! Missing fields take the defaults shown above.

use crate::error::{ConfigError, Result};
use crate::network::Architecture;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Bookkeeping name; does not affect the graph.
    pub name: String,
    /// Side of the square input image, in pixels.
    pub image_size: usize,
    pub nb_channels: usize,
    /// Width of the output head: one independent probability per label.
    pub nb_labels: usize,
    /// Carried for the training loop; graph construction ignores it.
    pub learning_rate: f32,
    pub architecture: Architecture,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "mapillary".to_string(),
            image_size: 512,
            nb_channels: 3,
            nb_labels: 65,
            learning_rate: 1e-4,
            architecture: Architecture::Simple,
        }
    }
}

impl NetworkConfig {
    pub fn new(name: &str, image_size: usize, nb_channels: usize, nb_labels: usize) -> Self {
        Self {
            name: name.to_string(),
            image_size,
            nb_channels,
            nb_labels,
            ..Default::default()
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_architecture(mut self, architecture: impl Into<Architecture>) -> Self {
        self.architecture = architecture.into();
        self
    }

    /// Checks every field that graph construction or training depends on.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        for (field, value) in [
            ("image_size", self.image_size),
            ("nb_channels", self.nb_channels),
            ("nb_labels", self.nb_labels),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::InvalidLearningRate(self.learning_rate));
        }
        Ok(())
    }

    /// Per-example shape of the input placeholder: `[image_size, image_size, nb_channels]`.
    pub fn input_shape(&self) -> Vec<usize> {
        vec![self.image_size, self.image_size, self.nb_channels]
    }
}

/// Loads a network configuration from a JSON file and validates it.
pub fn load_config(path: impl AsRef<Path>) -> Result<NetworkConfig> {
    let contents = fs::read_to_string(path)?;
    let config: NetworkConfig = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = NetworkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.input_shape(), vec![512, 512, 3]);
    }

    #[test]
    fn test_non_positive_fields_are_named() {
        let config = NetworkConfig::new("net", 64, 3, 0);
        assert_eq!(config.validate(), Err(ConfigError::NonPositive { field: "nb_labels", value: 0 }));

        let config = NetworkConfig::new("net", 0, 3, 10);
        assert_eq!(config.validate(), Err(ConfigError::NonPositive { field: "image_size", value: 0 }));
    }

    #[test]
    fn test_learning_rate_must_be_positive() {
        let config = NetworkConfig::default().with_learning_rate(0.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidLearningRate(0.0)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{"image_size": 128, "architecture": "Xception"}"#).unwrap();
        assert_eq!(config.image_size, 128);
        assert_eq!(config.nb_labels, 65);
        assert_eq!(config.architecture, Architecture::Xception);
    }

    #[test]
    fn test_load_config_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "shapes", "image_size": 64, "nb_labels": 0}}"#).unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NonPositive { field: "nb_labels", .. })));
    }

    #[test]
    fn test_load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "shapes", "image_size": 64, "nb_labels": 3, "architecture": "resnet"}}"#)
            .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.name, "shapes");
        assert_eq!(config.nb_channels, 3);
        assert_eq!(config.architecture, Architecture::Resnet);
    }
}
