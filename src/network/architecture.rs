//! Named architectures a feature detection network can be built with.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Closed set of architecture identifiers.
///
/// Parsing never fails: an identifier outside the set resolves to
/// [`Architecture::Simple`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Architecture {
    #[default]
    Simple,
    Vgg16,
    Vgg19,
    InceptionV1,
    InceptionV2,
    InceptionV3,
    InceptionV4,
    Xception,
    Resnet,
}

impl Architecture {
    pub const ALL: [Architecture; 9] = [
        Architecture::Simple,
        Architecture::Vgg16,
        Architecture::Vgg19,
        Architecture::InceptionV1,
        Architecture::InceptionV2,
        Architecture::InceptionV3,
        Architecture::InceptionV4,
        Architecture::Xception,
        Architecture::Resnet,
    ];

    /// Canonical identifier, e.g. `"inception-v3"`.
    pub fn tag(&self) -> &'static str {
        match self {
            Architecture::Simple => "simple",
            Architecture::Vgg16 => "vgg16",
            Architecture::Vgg19 => "vgg19",
            Architecture::InceptionV1 => "inception-v1",
            Architecture::InceptionV2 => "inception-v2",
            Architecture::InceptionV3 => "inception-v3",
            Architecture::InceptionV4 => "inception-v4",
            Architecture::Xception => "xception",
            Architecture::Resnet => "resnet",
        }
    }

    /// Resolves an identifier, case-insensitively.
    ///
    /// Unknown identifiers fall back to `Simple` with a warning.
    pub fn parse(name: &str) -> Self {
        match Self::ALL.iter().find(|a| a.tag().eq_ignore_ascii_case(name.trim())) {
            Some(architecture) => *architecture,
            None => {
                warn!(requested = name, fallback = "simple", "unrecognized architecture");
                Architecture::Simple
            }
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<String> for Architecture {
    fn from(name: String) -> Self {
        Architecture::parse(&name)
    }
}

impl From<&str> for Architecture {
    fn from(name: &str) -> Self {
        Architecture::parse(name)
    }
}

impl From<Architecture> for String {
    fn from(architecture: Architecture) -> Self {
        architecture.tag().to_string()
    }
}
