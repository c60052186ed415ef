//! The `solana-cli` layer
//!
//! Contributes the Solana toolchain and, on a cache miss, runs the build
//! pipeline inside it. A layer whose recorded checksum matches the
//! resolved dependency is reused without running any command.

pub mod pipeline;
pub mod process;

pub use pipeline::{BuildOrchestrator, Step, StepContext, ToolchainState, KEYPAIR_PATH};
pub use process::{ProcessTypeBuilder, DEPLOY_PROCESS};

use crate::config::ConfigurationResolver;
use crate::dependency::{BuildpackDependency, DependencyCache};
use crate::error::BuildpackResult;
use crate::layer::{DependencyLayerContributor, Layer, LayerTypes};
use crate::orchestration::CommandRunner;
use std::path::PathBuf;
use std::sync::Arc;

/// Dependency id of the Solana toolchain
pub const SOLANA_CLI: &str = "solana-cli";

/// Layer contributor for the Solana toolchain
pub struct Solana {
    contributor: DependencyLayerContributor,
    app_dir: PathBuf,
    config: ConfigurationResolver,
    runner: Arc<dyn CommandRunner>,
    keypair_path: PathBuf,
}

impl Solana {
    pub fn new(
        dependency: BuildpackDependency,
        cache: DependencyCache,
        app_dir: impl Into<PathBuf>,
        config: ConfigurationResolver,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            contributor: DependencyLayerContributor::new(dependency, cache, LayerTypes::all()),
            app_dir: app_dir.into(),
            config,
            runner,
            keypair_path: PathBuf::from(KEYPAIR_PATH),
        }
    }

    /// Write the wallet keypair to `path` instead of the fixed location
    pub fn with_keypair_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.keypair_path = path.into();
        self
    }

    /// Name of the contributed layer
    pub fn name(&self) -> &str {
        &self.contributor.dependency().id
    }

    /// Contribute the toolchain layer
    pub async fn contribute(&self, layer: Layer) -> BuildpackResult<Layer> {
        let strip_components = self.contributor.dependency().strip_components;

        self.contributor
            .contribute(layer, |artifact, layer| async move {
                let orchestrator = BuildOrchestrator::new(StepContext {
                    artifact: &artifact,
                    strip_components,
                    app_dir: &self.app_dir,
                    config: &self.config,
                    runner: self.runner.as_ref(),
                    keypair_path: &self.keypair_path,
                });
                let state = orchestrator.run(layer).await?;
                Ok(state.layer)
            })
            .await
    }
}
