//! Build phase
//!
//! Resolves the Solana toolchain, contributes its layer and declares the
//! process types. Persisting the result is left to the caller so the
//! build itself can be exercised without a CNB lifecycle.

use crate::config::{keys, BuildpackDescriptor, ConfigurationResolver};
use crate::dependency::{BuildpackDependency, DependencyCache, DependencyResolver};
use crate::detect::PLAN_ENTRY_SOLANA;
use crate::error::BuildpackResult;
use crate::launch::{BuildpackPlan, LaunchManifest, Process};
use crate::layer::{Layer, Layers};
use crate::orchestration::CommandRunner;
use crate::solana::{ProcessTypeBuilder, Solana, SOLANA_CLI};
use crate::ui;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Days ahead of a deprecation date the build starts warning
const DEPRECATION_WARNING_DAYS: i64 = 30;

/// Everything the build phase reads
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Application source directory
    pub app_dir: PathBuf,
    /// Parsed `buildpack.toml`
    pub buildpack: BuildpackDescriptor,
    /// Buildpack installation directory
    pub buildpack_dir: Option<PathBuf>,
    /// Entries the build was asked to provide
    pub plan: BuildpackPlan,
    /// CNB layers root
    pub layers: Layers,
    /// Current stack id
    pub stack_id: Option<String>,
    /// Resolved configuration
    pub config: ConfigurationResolver,
}

/// Layers and processes produced by a build
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub layers: Vec<Layer>,
    pub processes: Vec<Process>,
}

impl BuildResult {
    /// Write every layer's metadata and `launch.toml` under `layers`
    pub async fn persist(&self, layers: &Layers) -> BuildpackResult<()> {
        for layer in &self.layers {
            debug!("Persisting {}", layer.manifest_path().display());
            layer.persist().await?;
        }

        if !self.processes.is_empty() {
            LaunchManifest {
                processes: self.processes.clone(),
            }
            .write(&layers.path().join("launch.toml"))
            .await?;
        }
        Ok(())
    }
}

/// The build phase
pub struct Build {
    runner: Arc<dyn CommandRunner>,
    cache: Option<DependencyCache>,
    keypair_path: Option<PathBuf>,
}

impl Build {
    /// Create a build running toolchain commands through `runner`
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            cache: None,
            keypair_path: None,
        }
    }

    /// Use `cache` instead of the default dependency cache
    pub fn with_cache(mut self, cache: DependencyCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Write the wallet keypair to `path` instead of the fixed location
    pub fn with_keypair_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.keypair_path = Some(path.into());
        self
    }

    /// Run the build
    pub async fn build(&self, ctx: &BuildContext) -> BuildpackResult<BuildResult> {
        let info = &ctx.buildpack.buildpack;
        ui::title(&info.name, &info.version, info.homepage.as_deref());

        if !ctx.plan.contains(PLAN_ENTRY_SOLANA) {
            info!("Buildpack plan has no {} entry, skipping", PLAN_ENTRY_SOLANA);
            return Ok(BuildResult::default());
        }

        ui::config_table(&ctx.config.rows());

        let constraint = ctx.config.resolve(keys::CLI_VERSION).unwrap_or_default();
        let dependency = DependencyResolver::new(
            ctx.buildpack.metadata.dependencies.clone(),
            ctx.stack_id.clone(),
        )
        .resolve(SOLANA_CLI, constraint)?;
        warn_deprecation(&dependency);

        let enable = ctx.config.resolve(keys::DEPLOY_CONTRACT).unwrap_or_default();
        let processes = ProcessTypeBuilder::new(&ctx.app_dir).build_process_types(enable)?;

        let cache = self
            .cache
            .clone()
            .unwrap_or_else(|| DependencyCache::for_buildpack(ctx.buildpack_dir.as_deref()));
        let mut solana = Solana::new(
            dependency,
            cache,
            &ctx.app_dir,
            ctx.config.clone(),
            Arc::clone(&self.runner),
        );
        if let Some(ref path) = self.keypair_path {
            solana = solana.with_keypair_path(path);
        }

        let layer = ctx.layers.layer(solana.name()).await?;
        let layer = solana.contribute(layer).await?;

        if !processes.is_empty() {
            ui::header("Process types:");
            for process in &processes {
                ui::body(&format!(
                    "{}: {} {}",
                    process.kind,
                    process.command,
                    process.args.join(" ")
                ));
            }
        }

        Ok(BuildResult {
            layers: vec![layer],
            processes,
        })
    }
}

fn warn_deprecation(dependency: &BuildpackDependency) {
    let now = Utc::now();
    let Some(date) = dependency.deprecation() else {
        return;
    };

    if dependency.is_deprecated(now) {
        ui::warn(&format!(
            "{} was deprecated on {}",
            dependency,
            date.format("%Y-%m-%d")
        ));
    } else if dependency.is_soon_deprecated(now, DEPRECATION_WARNING_DAYS) {
        ui::warn(&format!(
            "{} will be deprecated on {}",
            dependency,
            date.format("%Y-%m-%d")
        ));
    }
}
