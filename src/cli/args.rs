//! CLI argument definitions using clap derive
//!
//! Arguments default to the environment variables the CNB lifecycle sets,
//! so the `bin/detect` and `bin/build` shims can invoke the binary with
//! just a subcommand.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Solana Buildpack - builds and configures Solana programs
///
/// Implements the detect and build phases of a Cloud Native Buildpack.
#[derive(Parser, Debug)]
#[command(name = "solana-buildpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decide whether the application is a Solana program (exit 0 pass, 100 fail)
    Detect(DetectArgs),

    /// Contribute the Solana toolchain and build the program
    Build(BuildArgs),
}

/// Arguments for the detect command
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Application directory
    #[arg(long, default_value = ".")]
    pub app_dir: PathBuf,

    /// Where to write the build plan on a pass
    #[arg(long, env = "CNB_BUILD_PLAN_PATH")]
    pub plan: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Application directory
    #[arg(long, default_value = ".")]
    pub app_dir: PathBuf,

    /// Layers directory
    #[arg(long, env = "CNB_LAYERS_DIR")]
    pub layers_dir: PathBuf,

    /// Platform directory
    #[arg(long, env = "CNB_PLATFORM_DIR")]
    pub platform_dir: Option<PathBuf>,

    /// Buildpack plan
    #[arg(long, env = "CNB_BP_PLAN_PATH")]
    pub plan: Option<PathBuf>,

    /// Buildpack installation directory (holds buildpack.toml)
    #[arg(long, env = "CNB_BUILDPACK_DIR")]
    pub buildpack_dir: PathBuf,

    /// Stack the build runs on
    #[arg(long, env = "CNB_STACK_ID")]
    pub stack_id: Option<String>,
}
