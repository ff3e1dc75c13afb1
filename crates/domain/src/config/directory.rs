use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Account directory
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the account records live and how links are written.
///
/// Lookups always go through the GraphQL account service unless the
/// `memory` backend is selected; `backend` picks the writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub backend: DirectoryBackend,
    #[serde(default = "d_graphql_url")]
    pub graphql_url: String,
    /// Per-request timeout for lookups and writes.
    #[serde(default = "d_8000")]
    pub timeout_ms: u64,
    /// Lifetime of the signed bearer token sent to the account service.
    #[serde(default = "d_token_ttl")]
    pub token_ttl_secs: u64,
    #[serde(default = "d_token_scopes")]
    pub token_scopes: String,
}

/// Link writer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    /// `linkDiscord` mutation on the account service.
    #[default]
    Graphql,
    /// Identity provider management API (`user_metadata.discord_id`).
    Management,
    /// In-process map. Development only.
    Memory,
}

impl std::fmt::Display for DirectoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DirectoryBackend::Graphql => "graphql",
            DirectoryBackend::Management => "management",
            DirectoryBackend::Memory => "memory",
        };
        f.write_str(name)
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::Graphql,
            graphql_url: d_graphql_url(),
            timeout_ms: 8000,
            token_ttl_secs: d_token_ttl(),
            token_scopes: d_token_scopes(),
        }
    }
}

fn d_graphql_url() -> String {
    "http://localhost:4000/".into()
}
fn d_8000() -> u64 {
    8000
}
fn d_token_ttl() -> u64 {
    60 * 60 * 24 * 5
}
fn d_token_scopes() -> String {
    "read:users write:users".into()
}
