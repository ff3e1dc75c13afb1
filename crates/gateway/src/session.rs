//! Per-browser link session, kept in an encrypted cookie.
//!
//! The cookie carries the pending OAuth `state` with its PKCE verifier, and
//! the two identities
//! gathered by the callbacks. Nothing is stored server-side. A session
//! older than `server.session.max_age_secs` is treated as empty.

use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::Utc;
use lb_domain::config::SessionCookieConfig;
use lb_domain::identity::{ExternalIdentity, InternalIdentity};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use crate::runtime::link::LinkContext;

/// Which login flow issued a pending `state` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginFlow {
    Primary,
    Discord,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    pub flow: LoginFlow,
    pub state: String,
    pub pkce_verifier: String,
}

impl std::fmt::Debug for PendingLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingLogin")
            .field("flow", &self.flow)
            .field("state", &self.state)
            .field("pkce_verifier", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub pending: Option<PendingLogin>,
    #[serde(default)]
    pub profile: Option<InternalIdentity>,
    #[serde(default)]
    pub discord: Option<ExternalIdentity>,
    /// Unix seconds; 0 until first stored.
    #[serde(default)]
    pub issued_at: i64,
}

impl SessionData {
    /// Snapshot the identities for the link flow.
    pub fn link_context(&self) -> LinkContext {
        LinkContext {
            internal: self.profile.clone(),
            external: self.discord.clone(),
        }
    }

    /// Consume the pending login if it belongs to `flow` and matches the
    /// `state` echoed back by the provider. Returns its PKCE verifier.
    pub fn take_pending(&mut self, flow: LoginFlow, returned: &str) -> Option<String> {
        let pending = self.pending.take()?;
        let matches =
            pending.flow == flow && bool::from(pending.state.as_bytes().ct_eq(returned.as_bytes()));
        matches.then_some(pending.pkce_verifier)
    }
}

/// Reads and writes [`SessionData`] through a [`PrivateCookieJar`].
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    secure: bool,
    max_age_secs: i64,
}

impl SessionCookie {
    pub fn from_config(cfg: &SessionCookieConfig) -> Self {
        Self {
            name: cfg.cookie_name.clone(),
            secure: cfg.secure,
            max_age_secs: cfg.max_age_secs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Missing, undecryptable, malformed or expired cookies all read as an
    /// empty session.
    pub fn load(&self, jar: &PrivateCookieJar) -> SessionData {
        let Some(cookie) = jar.get(&self.name) else {
            return SessionData::default();
        };
        let data: SessionData = match serde_json::from_str(cookie.value()) {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!(error = %e, "discarding malformed session cookie");
                return SessionData::default();
            }
        };
        if Utc::now().timestamp() - data.issued_at > self.max_age_secs {
            tracing::debug!("discarding expired session cookie");
            return SessionData::default();
        }
        data
    }

    pub fn store(&self, jar: PrivateCookieJar, data: &SessionData) -> PrivateCookieJar {
        let mut data = data.clone();
        if data.issued_at == 0 {
            data.issued_at = Utc::now().timestamp();
        }
        let value = match serde_json::to_string(&data) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize session; clearing it");
                return self.clear(jar);
            }
        };
        let cookie = Cookie::build((self.name.clone(), value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build();
        jar.add(cookie)
    }

    pub fn clear(&self, jar: PrivateCookieJar) -> PrivateCookieJar {
        jar.remove(Cookie::build((self.name.clone(), "")).path("/").build())
    }
}

/// Derive the 64-byte cookie key from `SECRET_KEY` of any length.
pub fn derive_cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
