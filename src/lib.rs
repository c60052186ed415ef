//! Solana Buildpack
//!
//! A Cloud Native Buildpack that detects Solana program projects,
//! provisions the Solana CLI into a cached layer and builds the program
//! with `cargo build-sbf`.

pub mod build;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod detect;
pub mod error;
pub mod launch;
pub mod layer;
pub mod orchestration;
pub mod solana;
pub mod ui;

pub use error::{BuildpackError, BuildpackResult};
