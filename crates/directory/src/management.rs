//! Identity-provider management API implementation of [`LinkWriter`].
//!
//! Stores the link as `user_metadata.discord_id` on the primary account.
//! Access tokens come from the client-credentials grant against the
//! tenant's `/oauth/token` and are cached until close to expiry.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use lb_domain::config::{DirectoryConfig, PrimaryProviderSecrets};
use lb_domain::error::{Error, Result};
use lb_domain::trace::TraceEvent;
use parking_lot::Mutex;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::graphql::from_reqwest;
use crate::provider::LinkWriter;
use crate::token::REFRESH_WINDOW_SECS;

/// Default `expires_in` when the token response omits it.
const DEFAULT_EXPIRES_IN_SECS: u64 = 86_400;

#[derive(Serialize)]
struct ClientCredentialsRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: &'a str,
}

/// `Debug` is manually implemented to redact the token.
#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl std::fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

struct CachedAccessToken {
    token: String,
    expires_at: u64,
}

/// Writes links directly onto the primary account's metadata.
pub struct ManagementApiWriter {
    http: Client,
    base: Url,
    client_id: String,
    client_secret: String,
    audience: String,
    cached: Mutex<Option<CachedAccessToken>>,
}

impl std::fmt::Debug for ManagementApiWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementApiWriter")
            .field("base", &self.base.as_str())
            .field("client_id", &self.client_id)
            .field("audience", &self.audience)
            .finish()
    }
}

impl ManagementApiWriter {
    pub fn new(cfg: &DirectoryConfig, primary: &PrimaryProviderSecrets) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        let base = tenant_base(&primary.domain)?;
        let audience = base
            .join("api/v2/")
            .map_err(|e| Error::Config(format!("management audience: {e}")))?
            .to_string();

        Ok(Self {
            http,
            base,
            client_id: primary.client_id.clone(),
            client_secret: primary.client_secret.clone(),
            audience,
            cached: Mutex::new(None),
        })
    }

    /// A management API token, fetched or reused from the cache.
    async fn access_token(&self) -> Result<String> {
        let now = unix_now();
        let fresh = self
            .cached
            .lock()
            .as_ref()
            .filter(|tok| tok.expires_at > now + REFRESH_WINDOW_SECS)
            .map(|tok| tok.token.clone());
        if let Some(token) = fresh {
            return Ok(token);
        }

        let url = self
            .base
            .join("oauth/token")
            .map_err(|e| Error::Config(format!("token url: {e}")))?;
        let req = ClientCredentialsRequest {
            grant_type: "client_credentials",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            audience: &self.audience,
        };

        let resp = self
            .http
            .post(url)
            .json(&req)
            .send()
            .await
            .map_err(from_reqwest)?;
        let status = resp.status();
        let body = resp.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(Error::Auth(format!(
                "client_credentials grant failed ({status}): {body}"
            )));
        }

        let parsed: AccessTokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::Decode(format!("token response: {e}")))?;
        let expires_in = parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        TraceEvent::ManagementTokenIssued { expires_in }.emit();

        *self.cached.lock() = Some(CachedAccessToken {
            token: parsed.access_token.clone(),
            expires_at: now + expires_in,
        });
        Ok(parsed.access_token)
    }

    /// `{base}/api/v2/users/{user_id}`, with the id percent-encoded as a
    /// single path segment (ids look like `auth0|abc`).
    fn user_url(&self, user_id: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("cannot-be-a-base URL: {}", self.base)))?
            .pop_if_empty()
            .extend(["api", "v2", "users", user_id]);
        Ok(url)
    }
}

#[async_trait]
impl LinkWriter for ManagementApiWriter {
    fn backend(&self) -> &'static str {
        "management"
    }

    async fn write(&self, user_id: &str, external_id: &str) -> Result<()> {
        let token = self.access_token().await?;
        let url = self.user_url(user_id)?;
        let body = serde_json::json!({
            "user_metadata": { "discord_id": external_id }
        });

        let start = Instant::now();
        let resp = self
            .http
            .patch(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;
        let status = resp.status();
        TraceEvent::DirectoryCall {
            endpoint: "PATCH /api/v2/users/{id}".into(),
            status: status.as_u16(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            // Drop the cached token so the next attempt fetches a new one.
            *self.cached.lock() = None;
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("management API ({status}): {text}")));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Directory(format!(
                "management API returned {status}: {text}"
            )));
        }
        Ok(())
    }
}

/// Accepts `tenant.auth0.com` or a full `https://tenant.auth0.com` URL.
fn tenant_base(domain: &str) -> Result<Url> {
    let raw = if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_owned()
    } else {
        format!("https://{domain}")
    };
    let raw = format!("{}/", raw.trim_end_matches('/'));
    Url::parse(&raw).map_err(|e| Error::Config(format!("invalid AUTH_DOMAIN {domain:?}: {e}")))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
