//! Wire types for the account service.
//!
//! Field names use `camelCase` on the wire and `snake_case` in Rust via
//! `#[serde(rename_all = "camelCase")]`.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Account record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A user record as the account service returns it.
///
/// The record doubles as the link record: the account is linked when
/// `discord_id` holds a non-empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub discord_id: Option<String>,
}

impl AccountRecord {
    /// A bare record with no link, as the in-memory directory creates them.
    pub fn unlinked(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            name: None,
            discord_id: None,
        }
    }

    /// The external id this account is linked to, if any.
    pub fn linked_external_id(&self) -> Option<&str> {
        self.discord_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GraphQL envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
pub(crate) struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

/// `{ account { getUser(...) { ... } } }`
#[derive(Debug, Deserialize)]
pub(crate) struct GetUserData {
    pub account: GetUserAccount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GetUserAccount {
    pub get_user: Option<AccountRecord>,
}

/// `{ account { linkDiscord(...) } }`
#[derive(Debug, Deserialize)]
pub(crate) struct LinkDiscordData {
    pub account: LinkDiscordAccount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LinkDiscordAccount {
    #[serde(default)]
    pub link_discord: serde_json::Value,
}
