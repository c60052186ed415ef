//! Build log output
//!
//! Buildpack logs are the only diagnostic surface a build has, so every
//! user-facing line goes through here with a fixed indentation scheme:
//!
//! ```text
//! Solana Buildpack 0.3.0
//!   https://github.com/amp-buildpacks/solana
//!   Build Configuration:
//!     $BP_SOLANA_CLI_VERSION  1.17.*  the Solana CLI version
//!   Solana CLI 1.17.17: Contributing to layer
//!     Expanding solana-release.tar.bz2 to /layers/solana-cli
//! ```
//!
//! Internal diagnostics use `tracing` instead.

mod output;

pub use output::{body, config_table, header, output, title, warn};
