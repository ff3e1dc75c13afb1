pub mod config;
pub mod doctor;

use clap::{Parser, Subcommand};

/// LinkBridge: links primary accounts to Discord accounts.
#[derive(Debug, Parser)]
#[command(name = "linkbridge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the web server (default when no subcommand is given).
    Serve,
    /// Check configuration, credentials and the account service.
    Doctor,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
    /// List the environment variables the server reads, and which are set.
    Env,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from `LB_CONFIG` (or `config.toml`). A missing
/// file yields the defaults. Returns the config and the path used.
pub fn load_config() -> anyhow::Result<(lb_domain::config::Config, String)> {
    let config_path = std::env::var("LB_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(path: &str) -> anyhow::Result<lb_domain::config::Config> {
    if !std::path::Path::new(path).exists() {
        return Ok(lb_domain::config::Config::default());
    }
    let raw =
        std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))
}
