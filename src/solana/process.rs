//! Process types exported into the application image

use crate::error::{BuildpackError, BuildpackResult};
use crate::launch::Process;
use std::path::{Path, PathBuf};

/// Process type that deploys the compiled program
pub const DEPLOY_PROCESS: &str = "deploy";

/// Deploy command used when the manifest names no program
const DEPLOY_ANY_PROGRAM: &str = "exec solana program deploy target/deploy/*.so";

/// Value of the deploy flag that enables the deploy process
const ENABLED: &str = "true";

/// Builds the process declarations for an application
#[derive(Debug, Clone)]
pub struct ProcessTypeBuilder {
    app_dir: PathBuf,
}

impl ProcessTypeBuilder {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
        }
    }

    /// Process declarations for the deploy flag value `enable`
    ///
    /// Only the exact value `true` enables the deploy process; anything
    /// else yields no processes.
    pub fn build_process_types(&self, enable: &str) -> BuildpackResult<Vec<Process>> {
        if enable != ENABLED {
            return Ok(Vec::new());
        }

        let process = match program_name(&self.app_dir.join("Cargo.toml"))? {
            Some(program) => Process::new(
                DEPLOY_PROCESS,
                "solana",
                [
                    "program".to_string(),
                    "deploy".to_string(),
                    format!("target/deploy/{}.so", program),
                ],
            ),
            // Workspace roots name no program; pick up the built object at launch
            None => Process::new(
                DEPLOY_PROCESS,
                "sh",
                ["-c".to_string(), DEPLOY_ANY_PROGRAM.to_string()],
            ),
        };
        Ok(vec![process.as_default()])
    }
}

/// Name of the shared object `cargo build-sbf` produces for `manifest`
///
/// `[lib].name` when set, otherwise `[package].name`, with `-` mapped to `_`.
/// `None` when the manifest names neither, as a `[workspace]` root does.
pub fn program_name(manifest: &Path) -> BuildpackResult<Option<String>> {
    let err = |reason: String| BuildpackError::ProgramName {
        path: manifest.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(manifest).map_err(|e| err(e.to_string()))?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| err(e.to_string()))?;

    Ok(["lib", "package"]
        .iter()
        .find_map(|section| table.get(*section)?.get("name")?.as_str())
        .map(|name| name.replace('-', "_")))
}
