//! Toolchain environment
//!
//! Environment overrides threaded explicitly into every spawned command,
//! so activating a toolchain never mutates the buildpack's own process
//! environment.

use crate::error::{BuildpackError, BuildpackResult};
use std::collections::BTreeMap;
use std::path::Path;

const PATH: &str = "PATH";

/// Environment variable overrides applied to spawned commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolchainEnv {
    vars: BTreeMap<String, String>,
}

impl ToolchainEnv {
    /// Create an empty environment (commands inherit the process env unchanged)
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the current process `PATH` as the starting point
    pub fn inherit() -> Self {
        let mut env = Self::new();
        if let Ok(path) = std::env::var(PATH) {
            env.set(PATH, path);
        }
        env
    }

    /// Set a variable override
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Get a variable override
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Iterate over all overrides
    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Prepend a directory to `PATH`
    pub fn prepend_path(&mut self, dir: &Path) -> BuildpackResult<()> {
        let mut dirs = vec![dir.to_path_buf()];
        if let Some(current) = self.get(PATH) {
            dirs.extend(std::env::split_paths(current).filter(|p| p != dir));
        }

        let joined = std::env::join_paths(dirs).map_err(|e| BuildpackError::EnvInvalid {
            name: PATH.to_string(),
            reason: e.to_string(),
        })?;

        let joined = joined.into_string().map_err(|_| BuildpackError::EnvInvalid {
            name: PATH.to_string(),
            reason: "not valid UTF-8".to_string(),
        })?;

        self.set(PATH, joined);
        Ok(())
    }
}
