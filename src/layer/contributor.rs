//! Dependency-backed layer contribution
//!
//! Expands a dependency into a layer exactly once per checksum. The
//! checksum recorded in the layer metadata after a successful contribution
//! is compared with the resolved dependency on every subsequent build.

use crate::dependency::{BuildpackDependency, DependencyCache};
use crate::error::BuildpackResult;
use crate::layer::{Layer, LayerTypes};
use crate::ui;
use std::future::Future;
use std::path::PathBuf;
use tracing::debug;

/// Metadata key the dependency is recorded under
const DEPENDENCY_KEY: &str = "dependency";

/// Contributes a layer from a single dependency artifact
#[derive(Debug, Clone)]
pub struct DependencyLayerContributor {
    dependency: BuildpackDependency,
    cache: DependencyCache,
    types: LayerTypes,
}

impl DependencyLayerContributor {
    /// Create a contributor for `dependency` producing a layer with `types`
    pub fn new(dependency: BuildpackDependency, cache: DependencyCache, types: LayerTypes) -> Self {
        Self {
            dependency,
            cache,
            types,
        }
    }

    /// The dependency being contributed
    pub fn dependency(&self) -> &BuildpackDependency {
        &self.dependency
    }

    /// Whether `layer` already holds this dependency
    pub fn is_cached(&self, layer: &Layer) -> bool {
        recorded_sha256(layer) == Some(self.dependency.sha256.as_str())
    }

    /// Contribute `layer`, invoking `build` with the artifact path on a cache miss
    ///
    /// On a cache hit the layer is returned with its types applied and
    /// `build` is never called. On a miss the layer is reset, the artifact
    /// fetched and `build` run; only a successful `build` records the
    /// dependency in the layer metadata.
    pub async fn contribute<F, Fut>(&self, mut layer: Layer, build: F) -> BuildpackResult<Layer>
    where
        F: FnOnce(PathBuf, Layer) -> Fut,
        Fut: Future<Output = BuildpackResult<Layer>>,
    {
        if self.is_cached(&layer) {
            ui::header(&format!("{}: Reusing cached layer", self.dependency));
            debug!("Layer {} matches sha256 {}", layer.name, self.dependency.sha256);
            layer.types = self.types;
            return Ok(layer);
        }

        ui::header(&format!("{}: Contributing to layer", self.dependency));
        layer.reset().await?;

        let artifact = self.cache.artifact(&self.dependency).await?;
        debug!("Using artifact {}", artifact.display());

        let mut layer = build(artifact, layer).await?;

        let recorded = toml::Value::try_from(&self.dependency)?;
        layer.metadata.insert(DEPENDENCY_KEY.to_string(), recorded);
        layer.types = self.types;
        Ok(layer)
    }
}

/// SHA-256 recorded by a previous contribution
fn recorded_sha256(layer: &Layer) -> Option<&str> {
    layer
        .metadata
        .get(DEPENDENCY_KEY)?
        .get("sha256")?
        .as_str()
}
