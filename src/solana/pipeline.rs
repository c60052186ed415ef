//! Toolchain build pipeline
//!
//! Runs inside a freshly reset `solana-cli` layer:
//!
//! | Step | Effect |
//! |------|--------|
//! | expand | extract the release archive into the layer |
//! | activate-path | prepend `<layer>/bin` to the toolchain `PATH` |
//! | verify-toolchain | `solana --version` |
//! | compile | `cargo build-sbf` in the application directory |
//! | configure-network | `solana config set --url <endpoint>` |
//! | import-credentials | write the wallet keypair, `solana config set --keypair <path>` |
//!
//! Steps run in order and the first failure stops the pipeline. Each
//! failure is wrapped with a message naming the step so the build log
//! shows where the build broke.

use crate::config::{keys, ConfigurationResolver};
use crate::error::{BuildpackError, BuildpackResult};
use crate::layer::{archive, Layer};
use crate::orchestration::{CommandRunner, Execution, ToolchainEnv};
use crate::ui;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fixed location of the imported wallet keypair
pub const KEYPAIR_PATH: &str = "/tmp/solana-keypair.json";

/// A single pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Expand,
    ActivatePath,
    VerifyToolchain,
    Compile,
    ConfigureNetwork,
    ImportCredentials,
}

impl Step {
    /// Every step, in execution order
    pub const ALL: [Step; 6] = [
        Step::Expand,
        Step::ActivatePath,
        Step::VerifyToolchain,
        Step::Compile,
        Step::ConfigureNetwork,
        Step::ImportCredentials,
    ];

    /// Stable step name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::ActivatePath => "activate-path",
            Self::VerifyToolchain => "verify-toolchain",
            Self::Compile => "compile",
            Self::ConfigureNetwork => "configure-network",
            Self::ImportCredentials => "import-credentials",
        }
    }

    fn failure(&self, ctx: &StepContext<'_>) -> String {
        match self {
            Self::Expand => format!("unable to expand {}", ctx.artifact.display()),
            Self::ActivatePath => "unable to set $PATH".to_string(),
            Self::VerifyToolchain => "unable to get solana version".to_string(),
            Self::Compile => "unable to build solana program".to_string(),
            Self::ConfigureNetwork => "unable to configure deploy network".to_string(),
            Self::ImportCredentials => "unable to import wallet keypair".to_string(),
        }
    }

    async fn run(&self, ctx: &StepContext<'_>, state: ToolchainState) -> BuildpackResult<ToolchainState> {
        match self {
            Self::Expand => expand(ctx, state).await,
            Self::ActivatePath => activate_path(state),
            Self::VerifyToolchain => verify_toolchain(ctx, state).await,
            Self::Compile => compile(ctx, state).await,
            Self::ConfigureNetwork => configure_network(ctx, state).await,
            Self::ImportCredentials => import_credentials(ctx, state).await,
        }
    }
}

/// State threaded from step to step
#[derive(Debug, Clone)]
pub struct ToolchainState {
    /// Layer the toolchain is expanded into
    pub layer: Layer,
    /// Environment overrides for toolchain commands
    pub env: ToolchainEnv,
    /// Reported toolchain version
    pub version: Option<String>,
    /// Network endpoint the CLI was configured with
    pub endpoint: Option<String>,
    /// Imported keypair file
    pub keypair: Option<PathBuf>,
}

impl ToolchainState {
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            env: ToolchainEnv::inherit(),
            version: None,
            endpoint: None,
            keypair: None,
        }
    }
}

/// Inputs shared by every step
pub struct StepContext<'a> {
    /// Downloaded toolchain archive
    pub artifact: &'a Path,
    /// Leading archive components to strip
    pub strip_components: usize,
    /// Application source directory
    pub app_dir: &'a Path,
    /// Build configuration
    pub config: &'a ConfigurationResolver,
    /// Runs the toolchain commands
    pub runner: &'a dyn CommandRunner,
    /// Where the wallet keypair is written
    pub keypair_path: &'a Path,
}

/// Runs the pipeline steps in order
pub struct BuildOrchestrator<'a> {
    ctx: StepContext<'a>,
    steps: Vec<Step>,
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(ctx: StepContext<'a>) -> Self {
        Self {
            ctx,
            steps: Step::ALL.to_vec(),
        }
    }

    /// Run every step against `layer`, stopping at the first failure
    pub async fn run(&self, layer: Layer) -> BuildpackResult<ToolchainState> {
        let mut state = ToolchainState::new(layer);
        for step in &self.steps {
            debug!("Running step {}", step.name());
            state = step
                .run(&self.ctx, state)
                .await
                .map_err(|e| BuildpackError::step(step.name(), step.failure(&self.ctx), e))?;
        }
        Ok(state)
    }
}

async fn expand(ctx: &StepContext<'_>, state: ToolchainState) -> BuildpackResult<ToolchainState> {
    ui::body(&format!(
        "Expanding {} to {}",
        ctx.artifact.display(),
        state.layer.path.display()
    ));

    let artifact = ctx.artifact.to_path_buf();
    let destination = state.layer.path.clone();
    let strip = ctx.strip_components;
    let count = tokio::task::spawn_blocking(move || archive::extract(&artifact, &destination, strip))
        .await
        .map_err(|e| BuildpackError::Internal(format!("extraction task failed: {}", e)))??;

    debug!("Extracted {} entries", count);
    Ok(state)
}

fn activate_path(mut state: ToolchainState) -> BuildpackResult<ToolchainState> {
    let bin = state.layer.bin_dir();
    ui::body(&format!("Setting {} in PATH", bin.display()));
    state.env.prepend_path(&bin)?;
    Ok(state)
}

async fn verify_toolchain(
    ctx: &StepContext<'_>,
    mut state: ToolchainState,
) -> BuildpackResult<ToolchainState> {
    let output = ctx
        .runner
        .execute(&Execution::new("solana", ["--version"]).with_env(&state.env))
        .await?;
    let version = output.trim().to_string();
    ui::body(&format!("Checking solana version: {}", version));
    state.version = Some(version);
    Ok(state)
}

async fn compile(ctx: &StepContext<'_>, state: ToolchainState) -> BuildpackResult<ToolchainState> {
    ui::body("Building solana program");
    ctx.runner
        .execute(
            &Execution::new("cargo", ["build-sbf"])
                .in_dir(ctx.app_dir)
                .with_env(&state.env),
        )
        .await?;
    Ok(state)
}

async fn configure_network(
    ctx: &StepContext<'_>,
    mut state: ToolchainState,
) -> BuildpackResult<ToolchainState> {
    let network = ctx.config.require(keys::DEPLOY_NETWORK)?;
    let endpoint = ctx.config.resolve_endpoint(network)?;
    ui::body(&format!("Configuring deploy network {}: {}", network, endpoint));

    ctx.runner
        .execute(&Execution::new("solana", ["config", "set", "--url", endpoint]).with_env(&state.env))
        .await?;
    state.endpoint = Some(endpoint.to_string());
    Ok(state)
}

async fn import_credentials(
    ctx: &StepContext<'_>,
    mut state: ToolchainState,
) -> BuildpackResult<ToolchainState> {
    let keypair = ctx.config.require(keys::DEPLOY_KEYPAIR)?;
    ui::body(&format!("Importing wallet keypair to {}", ctx.keypair_path.display()));
    write_secret(ctx.keypair_path, keypair.as_bytes()).await?;

    let path = ctx.keypair_path.to_string_lossy().into_owned();
    let result = ctx
        .runner
        .execute(&Execution::new("solana", ["config", "set", "--keypair", path.as_str()]).with_env(&state.env))
        .await;

    if let Err(e) = result {
        if let Err(remove) = tokio::fs::remove_file(ctx.keypair_path).await {
            debug!("Unable to remove {}: {}", ctx.keypair_path.display(), remove);
        }
        return Err(e);
    }

    state.keypair = Some(ctx.keypair_path.to_path_buf());
    Ok(state)
}

/// Write `content` to `path` readable only by the owner, replacing it atomically
///
/// The staging file is always created fresh so a leftover file or symlink
/// never decides its mode or target.
async fn write_secret(path: &Path, content: &[u8]) -> BuildpackResult<()> {
    use tokio::io::AsyncWriteExt;

    let staging = path.with_extension("json.tmp");
    match tokio::fs::remove_file(&staging).await {
        Ok(()) => debug!("Removed stale {}", staging.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(BuildpackError::io(format!("removing {}", staging.display()), e));
        }
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(&staging)
        .await
        .map_err(|e| BuildpackError::io(format!("creating {}", staging.display()), e))?;

    let written = async {
        file.write_all(content)
            .await
            .map_err(|e| BuildpackError::io(format!("writing {}", staging.display()), e))?;
        file.sync_all()
            .await
            .map_err(|e| BuildpackError::io(format!("syncing {}", staging.display()), e))
    }
    .await;
    drop(file);

    let result = match written {
        Ok(()) => tokio::fs::rename(&staging, path)
            .await
            .map_err(|e| BuildpackError::io(format!("moving keypair to {}", path.display()), e)),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(remove) = tokio::fs::remove_file(&staging).await {
            debug!("Unable to remove {}: {}", staging.display(), remove);
        }
    }
    result
}
