use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Link flow presentation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// Where users land when either account is already linked elsewhere.
    #[serde(default = "d_help_url")]
    pub conflict_help_url: String,
    /// Name of the primary account system used in user-facing text.
    #[serde(default = "d_label")]
    pub account_label: String,
    /// `returnTo` for the primary provider's logout endpoint. Defaults to
    /// the service root when unset.
    #[serde(default)]
    pub logout_return_to: Option<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            conflict_help_url: d_help_url(),
            account_label: d_label(),
            logout_return_to: None,
        }
    }
}

/// Chat-platform OAuth and REST endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default = "d_discord_api")]
    pub api_base: String,
    #[serde(default = "d_discord_authorize")]
    pub authorize_url: String,
    #[serde(default = "d_discord_token")]
    pub token_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: d_discord_api(),
            authorize_url: d_discord_authorize(),
            token_url: d_discord_token(),
        }
    }
}

fn d_help_url() -> String {
    "https://www.codeday.org/help/article/1N8IBXVNNojWtfiJf6QvX3".into()
}
fn d_label() -> String {
    "CodeDay".into()
}
fn d_discord_api() -> String {
    "https://discord.com/api/v10".into()
}
fn d_discord_authorize() -> String {
    "https://discord.com/api/oauth2/authorize".into()
}
fn d_discord_token() -> String {
    "https://discord.com/api/oauth2/token".into()
}
