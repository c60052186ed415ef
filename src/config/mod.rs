//! Build configuration
//!
//! Configuration is a flat string-to-string mapping. Values come from, in
//! increasing precedence: the defaults declared in `buildpack.toml`, the
//! platform's `env/` directory, and the process environment.

pub mod schema;

pub use schema::{BuildpackDescriptor, ConfigurationMetadata};

use crate::error::{BuildpackError, BuildpackResult};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Configuration keys understood by this buildpack
pub mod keys {
    /// Solana CLI version constraint
    pub const CLI_VERSION: &str = "BP_SOLANA_CLI_VERSION";
    /// Set to `true` to contribute the deploy process type
    pub const DEPLOY_CONTRACT: &str = "BP_DEPLOY_SOLANA_CONTRACT";
    /// Name of the network to deploy to (e.g. `devnet`)
    pub const DEPLOY_NETWORK: &str = "BP_SOLANA_DEPLOY_NETWORK";
    /// Wallet keypair JSON used to deploy
    pub const DEPLOY_KEYPAIR: &str = "BP_SOLANA_DEPLOY_KEYPAIR";
    /// Per-command timeout in seconds
    pub const COMMAND_TIMEOUT: &str = "BP_SOLANA_COMMAND_TIMEOUT";
}

/// Displayed in place of secret values
const REDACTED: &str = "<redacted>";

/// Resolves configuration values against their declared defaults
#[derive(Debug, Clone, Default)]
pub struct ConfigurationResolver {
    configurations: Vec<ConfigurationMetadata>,
    environment: HashMap<String, String>,
}

impl ConfigurationResolver {
    /// Create a resolver from declared configurations and explicit values
    pub fn new(
        configurations: Vec<ConfigurationMetadata>,
        environment: HashMap<String, String>,
    ) -> Self {
        Self {
            configurations,
            environment,
        }
    }

    /// Create a resolver from the platform `env/` directory and the process environment
    pub async fn from_platform(
        descriptor: &BuildpackDescriptor,
        platform_dir: Option<&Path>,
    ) -> BuildpackResult<Self> {
        let mut environment = match platform_dir {
            Some(dir) => read_platform_env(&dir.join("env")).await?,
            None => HashMap::new(),
        };
        environment.extend(std::env::vars());

        Ok(Self::new(
            descriptor.metadata.configurations.clone(),
            environment,
        ))
    }

    /// Resolve a key: the configured value if set, otherwise the declared default
    pub fn resolve(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.environment.get(key) {
            return Some(value.as_str());
        }
        self.configurations
            .iter()
            .find(|c| c.name == key)
            .and_then(|c| c.default.as_deref())
    }

    /// Resolve a key that must have a non-empty value
    pub fn require(&self, key: &str) -> BuildpackResult<&str> {
        match self.resolve(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(BuildpackError::ConfigUnresolved {
                key: key.to_string(),
            }),
        }
    }

    /// Configuration key holding the RPC endpoint of `network`
    ///
    /// `devnet` maps to `BP_DEVNET_ENDPOINT`; characters that cannot appear
    /// in an environment variable name become `_`, so `mainnet-beta` maps to
    /// `BP_MAINNET_BETA_ENDPOINT`.
    pub fn endpoint_key(network: &str) -> String {
        let network: String = network
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("BP_{}_ENDPOINT", network)
    }

    /// Resolve the RPC endpoint configured for `network`
    pub fn resolve_endpoint(&self, network: &str) -> BuildpackResult<&str> {
        self.require(&Self::endpoint_key(network))
    }

    /// Per-command timeout, if configured
    pub fn command_timeout(&self) -> BuildpackResult<Option<Duration>> {
        match self.resolve(keys::COMMAND_TIMEOUT).map(str::trim) {
            None | Some("") | Some("0") => Ok(None),
            Some(value) => value
                .parse::<u64>()
                .map(|secs| Some(Duration::from_secs(secs)))
                .map_err(|e| BuildpackError::EnvInvalid {
                    name: keys::COMMAND_TIMEOUT.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Rows of `(key, value, description)` for the declared build configuration
    ///
    /// Secret values are redacted.
    pub fn rows(&self) -> Vec<(String, String, String)> {
        self.configurations
            .iter()
            .filter(|c| c.build)
            .map(|c| {
                let value = match self.resolve(&c.name) {
                    Some(_) if c.secret => REDACTED.to_string(),
                    Some(value) => value.to_string(),
                    None => String::new(),
                };
                (c.name.clone(), value, c.description.clone())
            })
            .collect()
    }
}

/// Read `<platform>/env/<NAME>` files into a map
async fn read_platform_env(dir: &Path) -> BuildpackResult<HashMap<String, String>> {
    let mut environment = HashMap::new();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No platform env directory at {}", dir.display());
            return Ok(environment);
        }
        Err(e) => {
            return Err(BuildpackError::io(
                format!("reading platform env {}", dir.display()),
                e,
            ))
        }
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| BuildpackError::io("reading platform env entry", e))?
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let value = fs::read_to_string(&path)
            .await
            .map_err(|e| BuildpackError::io(format!("reading {}", path.display()), e))?;
        environment.insert(name.to_string(), value);
    }

    debug!("Read {} platform env values", environment.len());
    Ok(environment)
}
