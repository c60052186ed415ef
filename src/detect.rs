//! Project detection
//!
//! A tree is a Solana program project when it has a `Cargo.toml` at its
//! root and at least one Rust source file somewhere under `src/`. Absence
//! of either is a clean non-match; only unexpected I/O failures are errors.

use crate::error::{BuildpackError, BuildpackResult};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Build plan entry name provided and required by this buildpack
pub const PLAN_ENTRY_SOLANA: &str = "solana";

/// Manifest that must exist at the application root
const MANIFEST_FILE: &str = "Cargo.toml";

/// Directory scanned for program sources
const SOURCE_DIR: &str = "src";

/// Extension of program source files
const SOURCE_EXTENSION: &str = "rs";

/// Build plan `[[provides]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlanProvide {
    pub name: String,
}

/// Build plan `[[requires]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlanRequire {
    pub name: String,
}

/// Build plan written by a passing detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    #[serde(default)]
    pub provides: Vec<BuildPlanProvide>,
    #[serde(default)]
    pub requires: Vec<BuildPlanRequire>,
}

/// Outcome of detection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectResult {
    pub pass: bool,
    pub plans: Vec<BuildPlan>,
}

impl DetectResult {
    /// A non-matching result
    pub fn fail() -> Self {
        Self::default()
    }

    /// A matching result providing and requiring `name`
    pub fn pass(name: &str) -> Self {
        Self {
            pass: true,
            plans: vec![BuildPlan {
                provides: vec![BuildPlanProvide {
                    name: name.to_string(),
                }],
                requires: vec![BuildPlanRequire {
                    name: name.to_string(),
                }],
            }],
        }
    }
}

/// Build plan file layout: the first plan at the top level, alternatives under `[[or]]`
#[derive(Serialize)]
struct PlanDocument<'a> {
    provides: &'a [BuildPlanProvide],
    requires: &'a [BuildPlanRequire],
    #[serde(skip_serializing_if = "<[BuildPlan]>::is_empty")]
    or: &'a [BuildPlan],
}

impl DetectResult {
    /// Render the build plan file for a passing result
    pub fn plan_toml(&self) -> BuildpackResult<String> {
        let Some((first, rest)) = self.plans.split_first() else {
            return Ok(String::new());
        };
        let document = PlanDocument {
            provides: &first.provides,
            requires: &first.requires,
            or: rest,
        };
        Ok(toml::to_string(&document)?)
    }
}

/// Stateless Solana project detector
#[derive(Debug, Clone, Copy, Default)]
pub struct Detect;

impl Detect {
    /// Detect whether `app_dir` holds a Solana program project
    pub fn detect(&self, app_dir: &Path) -> BuildpackResult<DetectResult> {
        if self.solana_project(app_dir)? {
            Ok(DetectResult::pass(PLAN_ENTRY_SOLANA))
        } else {
            Ok(DetectResult::fail())
        }
    }

    fn solana_project(&self, app_dir: &Path) -> BuildpackResult<bool> {
        let manifest = app_dir.join(MANIFEST_FILE);
        match std::fs::metadata(&manifest) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found", manifest.display());
                return Ok(false);
            }
            Err(e) => {
                return Err(BuildpackError::DetectIo {
                    path: manifest,
                    source: e,
                })
            }
        }

        has_source_file(&app_dir.join(SOURCE_DIR))
    }
}

/// Walk `dir` looking for a file with the source extension
fn has_source_file(dir: &Path) -> BuildpackResult<bool> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Ok(false),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not found", dir.display());
            return Ok(false);
        }
        Err(e) => {
            return Err(BuildpackError::DetectIo {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    }

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                match e.into_io_error() {
                    // Removed while walking
                    Some(io) if io.kind() == ErrorKind::NotFound => continue,
                    Some(io) => return Err(BuildpackError::DetectIo { path, source: io }),
                    None => {
                        return Err(BuildpackError::DetectIo {
                            path,
                            source: std::io::Error::other("filesystem loop"),
                        })
                    }
                }
            }
        };

        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == SOURCE_EXTENSION)
        {
            debug!("Found program source {}", entry.path().display());
            return Ok(true);
        }
    }

    debug!("No *.{} files under {}", SOURCE_EXTENSION, dir.display());
    Ok(false)
}
