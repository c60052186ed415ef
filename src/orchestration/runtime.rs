//! Command runner abstraction
//!
//! Provides a trait for running external commands so the build pipeline
//! can be exercised with a fake runner in tests.

use crate::error::BuildpackResult;
use crate::orchestration::env::ToolchainEnv;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;

/// A single external command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    /// Program to run (resolved through `PATH`)
    pub command: String,
    /// Arguments passed to the program
    pub args: Vec<String>,
    /// Working directory (inherits the current one when unset)
    pub dir: Option<PathBuf>,
    /// Environment overrides
    pub env: ToolchainEnv,
}

impl Execution {
    /// Create an execution of `command` with `args`
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            env: ToolchainEnv::new(),
        }
    }

    /// Run in the given working directory
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Apply the given environment overrides
    pub fn with_env(mut self, env: &ToolchainEnv) -> Self {
        self.env = env.clone();
        self
    }
}

impl fmt::Display for Execution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Abstract command runner interface
///
/// Implementations run the command to completion and return its combined
/// stdout/stderr. A non-zero exit is an error carrying the captured output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and return its combined output
    async fn execute(&self, execution: &Execution) -> BuildpackResult<String>;
}
