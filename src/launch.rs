//! Launch metadata and the buildpack plan
//!
//! `launch.toml` declares the processes exported into the application
//! image. The buildpack plan lists the entries the build was asked to
//! satisfy; an absent plan file is an empty plan.

use crate::error::{BuildpackError, BuildpackResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A `[[processes]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    /// Process type, e.g. `deploy`
    #[serde(rename = "type")]
    pub kind: String,

    /// Executable to run
    pub command: String,

    /// Arguments passed to the executable
    #[serde(default)]
    pub args: Vec<String>,

    /// Whether this is the image's default process
    #[serde(default)]
    pub default: bool,
}

impl Process {
    pub fn new<I, S>(kind: impl Into<String>, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: kind.into(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            default: false,
        }
    }

    /// Mark the process as the default
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}

/// `<layers>/launch.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchManifest {
    #[serde(default)]
    pub processes: Vec<Process>,
}

impl LaunchManifest {
    /// Write the manifest to `path`
    pub async fn write(&self, path: &Path) -> BuildpackResult<()> {
        let content = toml::to_string(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| BuildpackError::io(format!("writing {}", path.display()), e))
    }
}

/// A `[[entries]]` item of the buildpack plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildpackPlanEntry {
    pub name: String,
    #[serde(default)]
    pub metadata: toml::Table,
}

/// The buildpack plan handed to the build phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildpackPlan {
    #[serde(default)]
    pub entries: Vec<BuildpackPlanEntry>,
}

impl BuildpackPlan {
    /// A plan with one entry per name
    pub fn with_entries<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            entries: names
                .into_iter()
                .map(|name| BuildpackPlanEntry {
                    name: name.to_string(),
                    metadata: toml::Table::new(),
                })
                .collect(),
        }
    }

    /// Read the plan from `path`; a missing file is an empty plan
    pub async fn from_file(path: &Path) -> BuildpackResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(BuildpackError::io(
                    format!("reading buildpack plan {}", path.display()),
                    e,
                ))
            }
        };

        toml::from_str(&content).map_err(|e| BuildpackError::PlanInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Whether the plan contains an entry named `name`
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn launch_manifest_uses_type_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("launch.toml");
        let manifest = LaunchManifest {
            processes: vec![Process::new(
                "deploy",
                "solana",
                ["program", "deploy", "target/deploy/hello.so"],
            )
            .as_default()],
        };

        manifest.write(&path).await.unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert!(content.contains("[[processes]]"));
        assert!(content.contains("type = \"deploy\""));
        assert!(content.contains("default = true"));
        let read: LaunchManifest = toml::from_str(&content).unwrap();
        assert_eq!(read, manifest);
    }

    #[tokio::test]
    async fn plan_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.toml");
        std::fs::write(&path, "[[entries]]\nname = \"solana\"\n").unwrap();

        let plan = BuildpackPlan::from_file(&path).await.unwrap();

        assert!(plan.contains("solana"));
        assert!(!plan.contains("node"));
    }

    #[tokio::test]
    async fn missing_plan_is_empty() {
        let dir = TempDir::new().unwrap();
        let plan = BuildpackPlan::from_file(&dir.path().join("plan.toml")).await.unwrap();
        assert!(plan.entries.is_empty());
    }

    #[tokio::test]
    async fn malformed_plan_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plan.toml");
        std::fs::write(&path, "entries = 3").unwrap();

        let result = BuildpackPlan::from_file(&path).await;
        assert!(matches!(result, Err(BuildpackError::PlanInvalid { .. })));
    }
}
