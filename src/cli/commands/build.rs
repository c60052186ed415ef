//! Build command - contribute the toolchain and persist the result

use crate::build::{Build, BuildContext};
use crate::cli::args::BuildArgs;
use crate::cli::commands::EXIT_PASS;
use crate::config::{BuildpackDescriptor, ConfigurationResolver};
use crate::error::BuildpackResult;
use crate::launch::BuildpackPlan;
use crate::layer::Layers;
use crate::orchestration::TokioCommandRunner;
use std::sync::Arc;
use tracing::debug;

/// Descriptor file at the root of the buildpack
const DESCRIPTOR_FILE: &str = "buildpack.toml";

/// Execute the build command
pub async fn execute(args: BuildArgs) -> BuildpackResult<u8> {
    let buildpack = BuildpackDescriptor::from_file(&args.buildpack_dir.join(DESCRIPTOR_FILE)).await?;
    debug!("Loaded {} {}", buildpack.buildpack.id, buildpack.buildpack.version);

    let config = ConfigurationResolver::from_platform(&buildpack, args.platform_dir.as_deref()).await?;
    let runner = TokioCommandRunner::new()
        .with_timeout(config.command_timeout()?)
        .with_echo(true);

    let plan = match args.plan {
        Some(ref path) => BuildpackPlan::from_file(path).await?,
        None => BuildpackPlan::default(),
    };

    let ctx = BuildContext {
        app_dir: args.app_dir,
        buildpack,
        buildpack_dir: Some(args.buildpack_dir),
        plan,
        layers: Layers::new(args.layers_dir),
        stack_id: args.stack_id,
        config,
    };

    let result = Build::new(Arc::new(runner)).build(&ctx).await?;
    result.persist(&ctx.layers).await?;

    Ok(EXIT_PASS)
}
