//! Credentials and provider endpoints sourced from the environment.
//!
//! Everything here is read once at startup. Missing variables are
//! collected and reported together so a misconfigured deployment fails
//! before it binds a port, not on the first request.

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Variable names
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const ENV_AUTH_CLIENT_ID: &str = "AUTH_CLIENT_ID";
pub const ENV_AUTH_CLIENT_SECRET: &str = "AUTH_CLIENT_SECRET";
pub const ENV_AUTH_DOMAIN: &str = "AUTH_DOMAIN";
pub const ENV_AUTH_API_BASE_URL: &str = "AUTH_API_BASE_URL";
pub const ENV_AUTH_ACCESS_TOKEN_URL: &str = "AUTH_ACCESS_TOKEN_URL";
pub const ENV_AUTH_AUTHORIZE_URL: &str = "AUTH_AUTHORIZE_URL";
pub const ENV_CALLBACK_URL: &str = "CALLBACK_URL";
pub const ENV_DISCORD_CLIENT_ID: &str = "DISCORD_CLIENT_ID";
pub const ENV_DISCORD_CLIENT_SECRET: &str = "DISCORD_CLIENT_SECRET";
pub const ENV_DISCORD_REDIRECT_URI: &str = "DISCORD_REDIRECT_URI";
pub const ENV_SECRET_KEY: &str = "SECRET_KEY";
pub const ENV_GQL_ACCOUNT_SECRET: &str = "GQL_ACCOUNT_SECRET";
pub const ENV_DISCORD_WEBHOOK: &str = "DISCORD_WEBHOOK";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Primary (OIDC) provider client registration.
#[derive(Clone)]
pub struct PrimaryProviderSecrets {
    pub client_id: String,
    pub client_secret: String,
    /// Tenant domain, e.g. `example.us.auth0.com`.
    pub domain: String,
    pub api_base_url: String,
    pub access_token_url: String,
    pub authorize_url: String,
    pub callback_url: String,
}

/// Chat-platform OAuth client registration.
#[derive(Clone)]
pub struct DiscordSecrets {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// All environment-sourced settings.
///
/// `Debug` is manually implemented to redact secrets.
#[derive(Clone)]
pub struct ProviderSecrets {
    pub primary: PrimaryProviderSecrets,
    pub discord: DiscordSecrets,
    /// Key material for the encrypted session cookie.
    pub session_key: String,
    /// HS256 secret for the account-service bearer token.
    pub gql_account_secret: String,
    /// Outgoing chat webhook. `None` disables notifications.
    pub webhook_url: Option<String>,
}

impl std::fmt::Debug for ProviderSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSecrets")
            .field("primary.client_id", &self.primary.client_id)
            .field("primary.client_secret", &"[REDACTED]")
            .field("primary.domain", &self.primary.domain)
            .field("discord.client_id", &self.discord.client_id)
            .field("discord.client_secret", &"[REDACTED]")
            .field("session_key", &"[REDACTED]")
            .field("gql_account_secret", &"[REDACTED]")
            .field("webhook_url", &self.webhook_url.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Loading
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl ProviderSecrets {
    /// Read every variable from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as
    /// missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut missing: Vec<&'static str> = Vec::new();
        let mut require = |name: &'static str| -> String {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(v) => v,
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let primary = PrimaryProviderSecrets {
            client_id: require(ENV_AUTH_CLIENT_ID),
            client_secret: require(ENV_AUTH_CLIENT_SECRET),
            domain: require(ENV_AUTH_DOMAIN),
            api_base_url: require(ENV_AUTH_API_BASE_URL),
            access_token_url: require(ENV_AUTH_ACCESS_TOKEN_URL),
            authorize_url: require(ENV_AUTH_AUTHORIZE_URL),
            callback_url: require(ENV_CALLBACK_URL),
        };
        let discord = DiscordSecrets {
            client_id: require(ENV_DISCORD_CLIENT_ID),
            client_secret: require(ENV_DISCORD_CLIENT_SECRET),
            redirect_uri: require(ENV_DISCORD_REDIRECT_URI),
        };
        let session_key = require(ENV_SECRET_KEY);
        let gql_account_secret = require(ENV_GQL_ACCOUNT_SECRET);

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let webhook_url = lookup(ENV_DISCORD_WEBHOOK).filter(|v| !v.trim().is_empty());

        Ok(Self {
            primary,
            discord,
            session_key,
            gql_account_secret,
            webhook_url,
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        [
            (ENV_AUTH_CLIENT_ID, "cid"),
            (ENV_AUTH_CLIENT_SECRET, "csecret"),
            (ENV_AUTH_DOMAIN, "tenant.auth0.com"),
            (ENV_AUTH_API_BASE_URL, "https://tenant.auth0.com"),
            (ENV_AUTH_ACCESS_TOKEN_URL, "https://tenant.auth0.com/oauth/token"),
            (ENV_AUTH_AUTHORIZE_URL, "https://tenant.auth0.com/authorize"),
            (ENV_CALLBACK_URL, "https://link.example.org/callback_auth0"),
            (ENV_DISCORD_CLIENT_ID, "did"),
            (ENV_DISCORD_CLIENT_SECRET, "dsecret"),
            (ENV_DISCORD_REDIRECT_URI, "https://link.example.org/callback_discord"),
            (ENV_SECRET_KEY, "session-key"),
            (ENV_GQL_ACCOUNT_SECRET, "gql-secret"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    #[test]
    fn complete_environment_loads() {
        let env = full_env();
        let secrets = ProviderSecrets::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(secrets.primary.domain, "tenant.auth0.com");
        assert_eq!(secrets.discord.client_id, "did");
        assert!(secrets.webhook_url.is_none());
    }

    #[test]
    fn webhook_is_optional_but_picked_up() {
        let mut env = full_env();
        env.insert(ENV_DISCORD_WEBHOOK, "https://discord.com/api/webhooks/1/x".into());
        let secrets = ProviderSecrets::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(
            secrets.webhook_url.as_deref(),
            Some("https://discord.com/api/webhooks/1/x")
        );
    }

    #[test]
    fn all_missing_variables_are_reported_together() {
        let mut env = full_env();
        env.remove(ENV_SECRET_KEY);
        env.insert(ENV_GQL_ACCOUNT_SECRET, "   ".into());
        let err = ProviderSecrets::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("SECRET_KEY"), "{msg}");
        assert!(msg.contains("GQL_ACCOUNT_SECRET"), "{msg}");
    }

    #[test]
    fn debug_redacts_secrets() {
        let env = full_env();
        let secrets = ProviderSecrets::from_lookup(|k| env.get(k).cloned()).unwrap();
        let dbg = format!("{secrets:?}");
        assert!(!dbg.contains("csecret"));
        assert!(!dbg.contains("gql-secret"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
