//! Solana Buildpack
//!
//! CLI entry point that dispatches to the detect and build phases.

use clap::Parser;
use console::style;
use solana_buildpack::cli::{commands, Cli, Commands};
use solana_buildpack::error::BuildpackResult;
use std::error::Error as _;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Paketo-style switch for debug logging
const LOG_LEVEL_ENV: &str = "BP_LOG_LEVEL";

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  {} {}", style("Caused by:").dim(), cause);
                source = cause.source();
            }
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> BuildpackResult<u8> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set
    let debug_requested = std::env::var(LOG_LEVEL_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("debug"));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        _ if debug_requested => EnvFilter::new("solana_buildpack=debug"),
        0 => EnvFilter::new("solana_buildpack=warn"),
        1 => EnvFilter::new("solana_buildpack=info"),
        _ => EnvFilter::new("solana_buildpack=debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Detect(args) => commands::detect(args).await,
        Commands::Build(args) => commands::build(args).await,
    }
}
