//! Error types for the Solana buildpack
//!
//! All modules use `BuildpackResult<T>` as their return type.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for buildpack operations
pub type BuildpackResult<T> = Result<T, BuildpackError>;

/// All errors that can occur while detecting or building
#[derive(Error, Debug)]
pub enum BuildpackError {
    // Detection errors
    #[error("unable to determine if {path} exists")]
    DetectIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("unable to resolve configuration {key}")]
    ConfigUnresolved { key: String },

    #[error("invalid value for ${name}: {reason}")]
    EnvInvalid { name: String, reason: String },

    #[error("invalid buildpack descriptor at {path}: {reason}")]
    DescriptorInvalid { path: PathBuf, reason: String },

    #[error("invalid buildpack plan at {path}: {reason}")]
    PlanInvalid { path: PathBuf, reason: String },

    // Dependency errors
    #[error("no valid dependencies for {id}, {constraint}, and {stack} in [{candidates}]")]
    NoValidDependency {
        id: String,
        constraint: String,
        stack: String,
        candidates: String,
    },

    #[error("invalid version constraint {constraint}: {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("unable to download {uri}: {reason}")]
    Download { uri: String, reason: String },

    #[error("sha256 mismatch for {uri}: expected {expected}, actual {actual}")]
    ChecksumMismatch {
        uri: String,
        expected: String,
        actual: String,
    },

    // Layer errors
    #[error("unable to extract {archive}: {reason}")]
    Extract { archive: PathBuf, reason: String },

    #[error("invalid layer metadata at {path}: {reason}")]
    LayerInvalid { path: PathBuf, reason: String },

    #[error("unable to determine program name from {path}: {reason}")]
    ProgramName { path: PathBuf, reason: String },

    // Process errors
    #[error("unable to start {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}\n{output}")]
    CommandExecution {
        command: String,
        status: String,
        output: String,
    },

    #[error("{command} timed out after {}s", .timeout.as_secs())]
    CommandTimeout { command: String, timeout: Duration },

    // Pipeline errors
    #[error("{message}")]
    Step {
        step: &'static str,
        message: String,
        #[source]
        source: Box<BuildpackError>,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BuildpackError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(
        command: impl Into<String>,
        status: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::CommandExecution {
            command: command.into(),
            status: status.into(),
            output: output.into(),
        }
    }

    /// Wrap an error with the message of the pipeline step it failed in
    pub fn step(step: &'static str, message: impl Into<String>, source: BuildpackError) -> Self {
        Self::Step {
            step,
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Name of the pipeline step this error was raised in, if any
    pub fn failed_step(&self) -> Option<&'static str> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ConfigUnresolved { key } => Some(format!("Set ${} in the build environment", key)),
            Self::NoValidDependency { .. } => {
                Some("Check $BP_SOLANA_CLI_VERSION against buildpack.toml".to_string())
            }
            Self::Step { source, .. } => source.hint(),
            _ => None,
        }
    }
}
