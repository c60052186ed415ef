//! Buildpack layers
//!
//! A layer is a directory under the CNB layers root plus a sibling
//! `<name>.toml` holding its types and metadata. Layers contributed from a
//! dependency are reused across builds while the dependency checksum
//! recorded in their metadata is unchanged.

pub mod archive;
mod contributor;
mod manifest;

pub use contributor::DependencyLayerContributor;
pub use manifest::{LayerManifest, LayerTypes};

use crate::error::{BuildpackError, BuildpackResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The CNB layers root
#[derive(Debug, Clone)]
pub struct Layers {
    path: PathBuf,
}

impl Layers {
    /// Wrap the layers root at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Layers root directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the layer `name`, including any metadata restored from a previous build
    pub async fn layer(&self, name: &str) -> BuildpackResult<Layer> {
        let manifest_path = self.path.join(format!("{}.toml", name));
        let manifest = LayerManifest::from_file(&manifest_path).await?;
        debug!(
            "Loaded layer {} (metadata keys: {})",
            name,
            manifest.metadata.len()
        );

        Ok(Layer {
            name: name.to_string(),
            path: self.path.join(name),
            manifest_path,
            types: manifest.types,
            metadata: manifest.metadata,
        })
    }
}

/// A single layer
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Layer name
    pub name: String,
    /// Layer content directory
    pub path: PathBuf,
    manifest_path: PathBuf,
    /// Phases the layer is available in
    pub types: LayerTypes,
    /// Buildpack-defined metadata
    pub metadata: toml::Table,
}

impl Layer {
    /// Path of the `<name>.toml` metadata file
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Executables directory of the layer
    pub fn bin_dir(&self) -> PathBuf {
        self.path.join("bin")
    }

    /// Discard any restored content and metadata
    ///
    /// Leaves an empty layer directory and no metadata file behind.
    pub async fn reset(&mut self) -> BuildpackResult<()> {
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BuildpackError::io(
                    format!("removing layer {}", self.path.display()),
                    e,
                ))
            }
        }
        match tokio::fs::remove_file(&self.manifest_path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BuildpackError::io(
                    format!("removing {}", self.manifest_path.display()),
                    e,
                ))
            }
        }

        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(|e| BuildpackError::io(format!("creating layer {}", self.path.display()), e))?;

        self.types = LayerTypes::default();
        self.metadata.clear();
        Ok(())
    }

    /// Write `<name>.toml` for this layer
    pub async fn persist(&self) -> BuildpackResult<()> {
        LayerManifest {
            types: self.types,
            metadata: self.metadata.clone(),
        }
        .write(&self.manifest_path)
        .await
    }
}
