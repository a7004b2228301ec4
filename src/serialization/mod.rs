//! Export of built networks.
//!
//! - **JSON**: the configuration together with the graph structure (no
//!   weights). Loading re-runs shape verification, so a hand-edited file
//!   cannot smuggle in an inconsistent graph.
//! - **DOT**: Graphviz rendering for visual inspection.
//!
//! ```rust,no_run
//! use deeposlandia::network::{FeatureDetectionNetwork, NetworkConfig};
//! use deeposlandia::serialization::{load_json, save_json, NetworkDescription};
//!
//! let network = FeatureDetectionNetwork::build(NetworkConfig::default())?;
//! save_json("mapillary.json", &NetworkDescription::from(&network))?;
//! let restored = load_json("mapillary.json")?;
//! # Ok::<(), deeposlandia::Error>(())
//! ```

pub mod description;
pub mod dot;

pub use description::{from_json_str, load_json, save_json, to_json_string, NetworkDescription};
pub use dot::to_dot;
