//! Dependency resolution
//!
//! Picks the highest version of a dependency id that satisfies a version
//! constraint and runs on the current stack.

use crate::dependency::BuildpackDependency;
use crate::error::{BuildpackError, BuildpackResult};
use semver::{Version, VersionReq};
use tracing::debug;

/// Stack wildcard matching every stack
const ANY_STACK: &str = "*";

/// Resolves dependency ids and constraints against the buildpack catalog
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    dependencies: Vec<BuildpackDependency>,
    stack_id: Option<String>,
}

impl DependencyResolver {
    /// Create a resolver over `dependencies` for the given stack
    ///
    /// With no stack id every dependency is considered compatible.
    pub fn new(dependencies: Vec<BuildpackDependency>, stack_id: Option<String>) -> Self {
        Self {
            dependencies,
            stack_id: stack_id.filter(|s| !s.is_empty()),
        }
    }

    /// Resolve `id` to the highest version satisfying `constraint`
    ///
    /// An empty constraint, `*` or `latest` accepts any version. A bare
    /// version such as `1.17.17` only matches that exact version.
    pub fn resolve(&self, id: &str, constraint: &str) -> BuildpackResult<BuildpackDependency> {
        let requirement = parse_constraint(constraint)?;

        let mut candidates: Vec<(Version, &BuildpackDependency)> = self
            .dependencies
            .iter()
            .filter(|d| d.id == id)
            .filter(|d| self.stack_matches(d))
            .filter_map(|d| match Version::parse(&normalize(&d.version)) {
                Ok(version) => Some((version, d)),
                Err(e) => {
                    debug!("Skipping {} {}: {}", d.id, d.version, e);
                    None
                }
            })
            .filter(|(version, _)| requirement.as_ref().map_or(true, |r| r.matches(version)))
            .collect();

        candidates.sort_by(|(a, _), (b, _)| b.cmp(a));

        match candidates.first() {
            Some((_, dependency)) => {
                debug!("Resolved {} {} to {}", id, constraint, dependency.version);
                Ok((*dependency).clone())
            }
            None => Err(BuildpackError::NoValidDependency {
                id: id.to_string(),
                constraint: constraint.to_string(),
                stack: self.stack_id.clone().unwrap_or_else(|| ANY_STACK.to_string()),
                candidates: self.describe_candidates(id),
            }),
        }
    }

    fn stack_matches(&self, dependency: &BuildpackDependency) -> bool {
        let Some(ref stack) = self.stack_id else {
            return true;
        };
        dependency.stacks.is_empty()
            || dependency
                .stacks
                .iter()
                .any(|s| s == ANY_STACK || s == stack)
    }

    fn describe_candidates(&self, id: &str) -> String {
        self.dependencies
            .iter()
            .filter(|d| d.id == id)
            .map(|d| format!("({}, {}, [{}])", d.id, d.version, d.stacks.join(", ")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parse a version constraint; `None` means any version
fn parse_constraint(constraint: &str) -> BuildpackResult<Option<VersionReq>> {
    let constraint = constraint.trim();
    if constraint.is_empty() || constraint == "*" || constraint.eq_ignore_ascii_case("latest") {
        return Ok(None);
    }

    // A bare version is an exact pin, not semver's default caret requirement
    let normalized = normalize(constraint);
    let requirement = if Version::parse(&normalized).is_ok() {
        format!("={}", normalized)
    } else {
        constraint.to_string()
    };

    VersionReq::parse(&requirement)
        .map(Some)
        .map_err(|e| BuildpackError::InvalidConstraint {
            constraint: constraint.to_string(),
            reason: e.to_string(),
        })
}

/// Strip a leading `v` from release tags such as `v1.17.17`
fn normalize(version: &str) -> String {
    version.trim().trim_start_matches('v').to_string()
}
