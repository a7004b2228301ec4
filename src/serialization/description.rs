use crate::analysis::ShapeInference;
use crate::asg::Asg;
use crate::error::Result;
use crate::network::{FeatureDetectionNetwork, NetworkConfig};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Configuration plus graph structure of a built network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDescription {
    pub config: NetworkConfig,
    pub graph: Asg,
}

impl From<&FeatureDetectionNetwork> for NetworkDescription {
    fn from(network: &FeatureDetectionNetwork) -> Self {
        Self { config: network.config().clone(), graph: network.graph() }
    }
}

impl NetworkDescription {
    /// Validates the configuration and re-infers every node shape.
    ///
    /// Shapes missing from the file are filled in; recorded shapes that
    /// disagree with the operations are rejected.
    pub fn verify(&mut self) -> Result<()> {
        self.config.validate()?;
        ShapeInference::run(&mut self.graph)?;
        Ok(())
    }
}

pub fn to_json_string(description: &NetworkDescription) -> Result<String> {
    Ok(serde_json::to_string_pretty(description)?)
}

/// Parses and verifies a description.
pub fn from_json_str(json: &str) -> Result<NetworkDescription> {
    let mut description: NetworkDescription = serde_json::from_str(json)?;
    description.verify()?;
    Ok(description)
}

/// Writes `description` as pretty-printed JSON, creating parent directories.
pub fn save_json<P: AsRef<Path>>(path: P, description: &NetworkDescription) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let json = to_json_string(description)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    debug!(path = %path.display(), nodes = description.graph.nodes.len(), "network description saved");
    Ok(())
}

pub fn load_json<P: AsRef<Path>>(path: P) -> Result<NetworkDescription> {
    let contents = fs::read_to_string(path)?;
    from_json_str(&contents)
}
