//! Bearer tokens for the account service.
//!
//! The account service trusts HS256 JWTs signed with a shared secret and
//! carrying a `scopes` claim. Tokens are signed locally, cached, and
//! re-signed once less than [`REFRESH_WINDOW_SECS`] of validity remain.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, EncodingKey, Header};
use lb_domain::error::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Re-sign when less than 5 minutes remain.
pub const REFRESH_WINDOW_SECS: u64 = 300;

/// Claims understood by the account service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceClaims {
    pub exp: u64,
    pub scopes: String,
}

struct CachedToken {
    token: String,
    expires_at: u64,
}

/// Signs and caches account-service bearer tokens.
pub struct ServiceTokenSigner {
    key: EncodingKey,
    ttl_secs: u64,
    scopes: String,
    cached: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for ServiceTokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTokenSigner")
            .field("key", &"[REDACTED]")
            .field("ttl_secs", &self.ttl_secs)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl ServiceTokenSigner {
    pub fn new(secret: &str, ttl_secs: u64, scopes: impl Into<String>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
            scopes: scopes.into(),
            cached: Mutex::new(None),
        }
    }

    /// A token valid for at least the refresh window.
    pub fn bearer(&self) -> Result<String> {
        self.bearer_at(unix_now())
    }

    pub(crate) fn bearer_at(&self, now: u64) -> Result<String> {
        let mut cached = self.cached.lock();
        if let Some(ref tok) = *cached {
            if tok.expires_at > now + REFRESH_WINDOW_SECS {
                return Ok(tok.token.clone());
            }
        }

        let claims = ServiceClaims {
            exp: now + self.ttl_secs,
            scopes: self.scopes.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.key)
            .map_err(|e| Error::Auth(format!("signing account-service token: {e}")))?;

        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: claims.exp,
        });
        Ok(token)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
