mod directory;
mod links;
mod notify;
mod observability;
mod secrets;
mod server;

pub use directory::*;
pub use links::*;
pub use notify::*;
pub use observability::*;
pub use secrets::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Non-secret tunables, loaded from `config.toml`.
///
/// Credentials never live here; see [`ProviderSecrets`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }

        if self.directory.backend == DirectoryBackend::Graphql
            && self.directory.graphql_url.trim().is_empty()
        {
            errors.push(ConfigError::error(
                "directory.graphql_url",
                "graphql_url must not be empty",
            ));
        }
        if self.directory.timeout_ms == 0 {
            errors.push(ConfigError::error(
                "directory.timeout_ms",
                "timeout must be greater than 0",
            ));
        }
        if self.directory.backend == DirectoryBackend::Memory {
            errors.push(ConfigError::warning(
                "directory.backend",
                "in-memory directory loses every link on restart (development only)",
            ));
        }

        if self.notify.max_attempts == 0 {
            errors.push(ConfigError::error(
                "notify.max_attempts",
                "at least one attempt is required",
            ));
        }

        if !self.links.conflict_help_url.starts_with("http") {
            errors.push(ConfigError::error(
                "links.conflict_help_url",
                "must be an absolute http(s) URL",
            ));
        }

        errors
    }
}
