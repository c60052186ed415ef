//! Toolchain dependencies
//!
//! Dependencies are declared in the `[[metadata.dependencies]]` catalog of
//! `buildpack.toml`, resolved by id and version constraint, and downloaded
//! into a content-addressed cache keyed by their SHA-256.
//!
//! # Cache Layout
//!
//! | Path | Contents |
//! |------|----------|
//! | `<root>/<sha256>.toml` | the dependency descriptor |
//! | `<root>/<sha256>/<file>` | the verified artifact |

pub mod cache;
pub mod resolve;

pub use cache::DependencyCache;
pub use resolve::DependencyResolver;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved, downloadable toolchain artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildpackDependency {
    /// Logical dependency id (e.g. `solana-cli`)
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Concrete version
    pub version: String,

    /// Download location (`https://` or `file://`)
    pub uri: String,

    /// Hex-encoded SHA-256 of the artifact
    pub sha256: String,

    /// Stacks the artifact runs on (`*` for any)
    #[serde(default)]
    pub stacks: Vec<String>,

    /// Licenses of the artifact
    #[serde(default)]
    pub licenses: Vec<License>,

    /// Leading path components stripped when expanding the archive
    #[serde(default)]
    pub strip_components: usize,

    /// Package URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purl: Option<String>,

    /// Common Platform Enumerations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cpes: Vec<String>,

    /// Date after which the dependency should no longer be used
    #[serde(
        default,
        rename = "deprecation_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub deprecation_date: Option<toml::value::Datetime>,
}

/// A dependency license, either a bare SPDX id or a detailed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum License {
    Id(String),
    Detailed {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
    },
}

impl License {
    /// SPDX id of the license
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Detailed { kind, .. } => kind,
        }
    }
}

impl BuildpackDependency {
    /// Display name, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Name of the artifact file (last segment of the URI)
    pub fn file_name(&self) -> &str {
        let without_query = self.uri.split(['?', '#']).next().unwrap_or(&self.uri);
        without_query
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.sha256)
    }

    /// Parsed deprecation date, if declared and valid
    ///
    /// Date-only and local values are taken as midnight or wall time in UTC.
    pub fn deprecation(&self) -> Option<DateTime<Utc>> {
        let datetime = self.deprecation_date.as_ref()?;
        let date = datetime.date?;
        let date = NaiveDate::from_ymd_opt(date.year.into(), date.month.into(), date.day.into())?;
        let time = match datetime.time {
            Some(time) => NaiveTime::from_hms_nano_opt(
                time.hour.into(),
                time.minute.into(),
                time.second.into(),
                time.nanosecond,
            )?,
            None => NaiveTime::from_hms_opt(0, 0, 0)?,
        };
        let offset = match datetime.offset {
            Some(toml::value::Offset::Custom { minutes }) => i64::from(minutes),
            _ => 0,
        };

        Some((date.and_time(time) - chrono::Duration::minutes(offset)).and_utc())
    }

    /// Whether the dependency is past its deprecation date at `now`
    pub fn is_deprecated(&self, now: DateTime<Utc>) -> bool {
        self.deprecation().is_some_and(|date| date <= now)
    }

    /// Whether the dependency is deprecated within `days` of `now`
    pub fn is_soon_deprecated(&self, now: DateTime<Utc>, days: i64) -> bool {
        self.deprecation()
            .is_some_and(|date| date > now && date <= now + chrono::Duration::days(days))
    }
}

impl fmt::Display for BuildpackDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.display_name(), self.version)
    }
}
