//! Layer metadata file
//!
//! Each layer directory `<layers>/<name>` has a sibling `<name>.toml`
//! declaring when the layer is available and carrying arbitrary metadata
//! used to decide whether cached content can be reused.

use crate::error::{BuildpackError, BuildpackResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parsed `<layers>/<name>.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerManifest {
    /// Phases the layer is available in
    #[serde(default)]
    pub types: LayerTypes,

    /// Buildpack-defined metadata
    #[serde(default)]
    pub metadata: toml::Table,
}

/// `[types]` section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerTypes {
    /// Available to subsequent buildpacks during the build
    pub build: bool,
    /// Restored on the next build
    pub cache: bool,
    /// Exported into the application image
    pub launch: bool,
}

impl LayerTypes {
    /// Available everywhere: build, cache and launch
    pub fn all() -> Self {
        Self {
            build: true,
            cache: true,
            launch: true,
        }
    }
}

impl LayerManifest {
    /// Read a manifest from disk; a missing file is an empty manifest
    pub async fn from_file(path: &Path) -> BuildpackResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(BuildpackError::io(
                    format!("reading layer metadata {}", path.display()),
                    e,
                ))
            }
        };

        toml::from_str(&content).map_err(|e| BuildpackError::LayerInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write the manifest to disk
    pub async fn write(&self, path: &Path) -> BuildpackResult<()> {
        let content = toml::to_string(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| BuildpackError::io(format!("writing layer metadata {}", path.display()), e))
    }
}
