//! Buildpack descriptor schema
//!
//! Mirrors the `buildpack.toml` shipped next to the buildpack binaries.
//! The `[metadata]` table carries the configuration keys this buildpack
//! understands and the dependency catalog the toolchain is resolved from.

use crate::dependency::BuildpackDependency;
use crate::error::{BuildpackError, BuildpackResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root of `buildpack.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildpackDescriptor {
    /// Buildpack API version
    pub api: String,

    /// Buildpack identity
    pub buildpack: BuildpackInfo,

    /// Stacks this buildpack is compatible with
    #[serde(default)]
    pub stacks: Vec<Stack>,

    /// Buildpack-specific metadata
    #[serde(default)]
    pub metadata: BuildpackMetadata,
}

/// `[buildpack]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildpackInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub homepage: Option<String>,
    pub description: Option<String>,
}

/// `[[stacks]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    pub id: String,
}

/// `[metadata]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackMetadata {
    /// Configuration keys and their defaults
    pub configurations: Vec<ConfigurationMetadata>,

    /// Dependency catalog
    pub dependencies: Vec<BuildpackDependency>,
}

/// `[[metadata.configurations]]` entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationMetadata {
    /// Environment variable name
    pub name: String,

    /// Value used when the variable is not set
    pub default: Option<String>,

    /// Human-readable description
    pub description: String,

    /// Whether the key affects the build phase
    pub build: bool,

    /// Whether the key affects the launch phase
    pub launch: bool,

    /// Never print the value in the build log
    pub secret: bool,
}

impl BuildpackDescriptor {
    /// Parse a descriptor from a TOML file on disk
    pub async fn from_file(path: &Path) -> BuildpackResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            BuildpackError::io(format!("reading buildpack descriptor {}", path.display()), e)
        })?;
        Self::parse(&content).map_err(|e| match e {
            BuildpackError::DescriptorInvalid { reason, .. } => BuildpackError::DescriptorInvalid {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse a descriptor from a TOML string
    pub fn parse(content: &str) -> BuildpackResult<Self> {
        toml::from_str(content).map_err(|e| BuildpackError::DescriptorInvalid {
            path: "buildpack.toml".into(),
            reason: e.to_string(),
        })
    }
}
