//! GraphQL implementation of [`AccountLookup`] and [`LinkWriter`].
//!
//! `GraphQlDirectory` wraps a `reqwest::Client` and sends each operation
//! as a single `POST {query, variables}` to the account service, with a
//! freshly cached bearer token. Lookups and writes are not retried; any
//! failure surfaces to the link flow as an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lb_domain::config::DirectoryConfig;
use lb_domain::error::{Error, Result};
use lb_domain::trace::TraceEvent;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::provider::{AccountLookup, LinkWriter};
use crate::token::ServiceTokenSigner;
use crate::types::{
    AccountRecord, GetUserData, GraphQlRequest, GraphQlResponse, LinkDiscordData,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Operations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const GET_USER_BY_ID: &str = r#"
query getUserFromUserId($id: ID!) {
  account {
    getUser(where: {id: $id}, fresh: true) {
      id
      username
      name
      discordId
    }
  }
}
"#;

pub const GET_USER_BY_DISCORD_ID: &str = r#"
query getUserFromDiscordId($id: String!) {
  account {
    getUser(where: {discordId: $id}, fresh: true) {
      id
      username
      name
      discordId
    }
  }
}
"#;

pub const LINK_DISCORD: &str = r#"
mutation linkDiscord($userId: ID!, $discordId: String!) {
  account {
    linkDiscord(userId: $userId, discordId: $discordId)
  }
}
"#;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A GraphQL client for the account service.
///
/// Created once and shared; the underlying `reqwest::Client` keeps a
/// connection pool.
#[derive(Debug, Clone)]
pub struct GraphQlDirectory {
    http: Client,
    url: String,
    signer: Arc<ServiceTokenSigner>,
}

impl GraphQlDirectory {
    /// Build a new client from the directory config and the token secret.
    pub fn new(cfg: &DirectoryConfig, token_secret: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            url: cfg.graphql_url.clone(),
            signer: Arc::new(ServiceTokenSigner::new(
                token_secret,
                cfg.token_ttl_secs,
                cfg.token_scopes.clone(),
            )),
        })
    }

    /// Send one operation and decode its `data` member.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let token = self.signer.bearer()?;
        let body = GraphQlRequest { query, variables };

        let start = Instant::now();
        let result = self
            .http
            .post(&self.url)
            .bearer_auth(token)
            .header("X-Trace-Id", Uuid::new_v4().to_string())
            .json(&body)
            .send()
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                TraceEvent::DirectoryCall {
                    endpoint: operation.to_owned(),
                    status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                    duration_ms,
                }
                .emit();
                return Err(from_reqwest(e));
            }
        };

        let status = resp.status();
        TraceEvent::DirectoryCall {
            endpoint: operation.to_owned(),
            status: status.as_u16(),
            duration_ms,
        }
        .emit();

        let text = resp.text().await.map_err(from_reqwest)?;
        decode_response(operation, status, &text)
    }
}

/// Interpret an account-service reply.
///
/// Split out from [`GraphQlDirectory::execute`] so the classification of
/// every failure shape can be tested without a server.
pub(crate) fn decode_response<T: DeserializeOwned>(
    operation: &str,
    status: StatusCode,
    body: &str,
) -> Result<T> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(Error::Auth(format!("{operation} auth failed ({status}): {body}")));
    }
    if !status.is_success() {
        return Err(Error::Directory(format!("{operation} returned {status}: {body}")));
    }

    let parsed: GraphQlResponse<T> = serde_json::from_str(body)
        .map_err(|e| Error::Decode(format!("{operation}: {e}: {body}")))?;

    if let Some(errors) = parsed.errors.filter(|errs| !errs.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::Directory(format!(
            "{operation}: {}",
            messages.join("; ")
        )));
    }

    parsed
        .data
        .ok_or_else(|| Error::Decode(format!("{operation}: response has no data")))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementations
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl AccountLookup for GraphQlDirectory {
    async fn find_by_internal_id(&self, user_id: &str) -> Result<Option<AccountRecord>> {
        let data: GetUserData = self
            .execute(
                "getUserFromUserId",
                GET_USER_BY_ID,
                serde_json::json!({ "id": user_id }),
            )
            .await?;
        Ok(data.account.get_user)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<AccountRecord>> {
        let data: GetUserData = self
            .execute(
                "getUserFromDiscordId",
                GET_USER_BY_DISCORD_ID,
                serde_json::json!({ "id": external_id }),
            )
            .await?;
        Ok(data.account.get_user)
    }
}

#[async_trait]
impl LinkWriter for GraphQlDirectory {
    fn backend(&self) -> &'static str {
        "graphql"
    }

    async fn write(&self, user_id: &str, external_id: &str) -> Result<()> {
        let data: LinkDiscordData = self
            .execute(
                "linkDiscord",
                LINK_DISCORD,
                serde_json::json!({ "userId": user_id, "discordId": external_id }),
            )
            .await?;

        if data.account.link_discord == serde_json::Value::Bool(false) {
            return Err(Error::Directory(format!(
                "linkDiscord rejected {user_id} -> {external_id}"
            )));
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
