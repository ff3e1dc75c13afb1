//! Authorization-code login against the primary identity provider and
//! Discord.
//!
//! Each provider wraps an `oauth2` [`BasicClient`] for the authorize
//! redirect and the PKCE code exchange, plus a profile call that maps the
//! provider's user onto a domain identity.

use std::time::Duration;

use lb_domain::config::{DiscordConfig, ProviderSecrets};
use lb_domain::identity::{ExternalIdentity, InternalIdentity};
use oauth2::basic::BasicClient;
use oauth2::{
    AccessToken, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use reqwest::{Client, Url};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("login state did not match")]
    InvalidState,
    #[error("provider denied the login: {0}")]
    Denied(String),
    #[error("callback is missing the authorization code")]
    MissingCode,
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("user info request failed: {0}")]
    UserInfo(String),
    #[error("invalid provider URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Query string the providers send back to a callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// The authorization code, or why the provider did not send one.
    pub fn code(&self) -> Result<&str, OAuthError> {
        if let Some(err) = &self.error {
            let detail = self
                .error_description
                .as_deref()
                .map(|d| format!("{err}: {d}"))
                .unwrap_or_else(|| err.clone());
            return Err(OAuthError::Denied(detail));
        }
        self.code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(OAuthError::MissingCode)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where to send the browser, plus the secrets the callback needs back.
#[derive(Debug)]
pub struct LoginStart {
    pub url: oauth2::url::Url,
    pub csrf: CsrfToken,
    pub pkce_verifier: PkceCodeVerifier,
}

/// One provider's authorization-code client. Credentials go in the token
/// request body, which both providers accept.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    inner: BasicClient,
    scopes: &'static [&'static str],
}

impl ProviderClient {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        authorize_url: &str,
        token_url: &str,
        redirect_uri: &str,
        scopes: &'static [&'static str],
    ) -> Result<Self, OAuthError> {
        let inner = BasicClient::new(
            ClientId::new(client_id.to_owned()),
            Some(ClientSecret::new(client_secret.to_owned())),
            AuthUrl::new(authorize_url.to_owned()).map_err(|e| invalid_url(authorize_url, e))?,
            Some(TokenUrl::new(token_url.to_owned()).map_err(|e| invalid_url(token_url, e))?),
        )
        .set_auth_type(AuthType::RequestBody)
        .set_redirect_uri(
            RedirectUrl::new(redirect_uri.to_owned()).map_err(|e| invalid_url(redirect_uri, e))?,
        );
        Ok(Self { inner, scopes })
    }

    /// Mint a fresh CSRF state and PKCE pair and build the authorize URL.
    pub fn begin(&self) -> LoginStart {
        let (challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (url, csrf) = self
            .inner
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().map(|s| Scope::new((*s).to_owned())))
            .set_pkce_challenge(challenge)
            .url();
        LoginStart {
            url,
            csrf,
            pkce_verifier,
        }
    }

    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<AccessToken, OAuthError> {
        let token = self
            .inner
            .exchange_code(AuthorizationCode::new(code.to_owned()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_owned()))
            .request_async(oauth2::reqwest::async_http_client)
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;
        Ok(token.access_token().clone())
    }
}

fn invalid_url(url: &str, err: impl std::fmt::Display) -> OAuthError {
    OAuthError::InvalidUrl {
        url: url.to_owned(),
        reason: err.to_string(),
    }
}

async fn fetch_json<T: serde::de::DeserializeOwned>(
    http: &Client,
    url: Url,
    access_token: &AccessToken,
) -> Result<T, OAuthError> {
    let resp = http
        .get(url)
        .bearer_auth(access_token.secret())
        .send()
        .await
        .map_err(|e| OAuthError::UserInfo(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(OAuthError::UserInfo(format!("{status}: {body}")));
    }
    resp.json()
        .await
        .map_err(|e| OAuthError::UserInfo(e.to_string()))
}

fn parse_url(raw: &str) -> Result<Url, OAuthError> {
    Url::parse(raw).map_err(|e| invalid_url(raw, e))
}

/// Append `path` to `base`, keeping any path `base` already has.
fn join_path(base: &str, path: &str) -> Result<Url, OAuthError> {
    parse_url(&format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Primary identity provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const PRIMARY_SCOPES: &[&str] = &["openid", "profile", "email"];

#[derive(Debug, Deserialize)]
struct PrimaryUserInfo {
    sub: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nickname: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

impl From<PrimaryUserInfo> for InternalIdentity {
    fn from(info: PrimaryUserInfo) -> Self {
        let display_name = info
            .name
            .or(info.nickname)
            .unwrap_or_else(|| info.sub.clone());
        InternalIdentity {
            user_id: info.sub,
            display_name,
            avatar_url: info.picture.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrimaryProvider {
    pub client: ProviderClient,
    client_id: String,
    userinfo_url: Url,
    logout_url: Url,
    default_return_to: String,
}

impl PrimaryProvider {
    pub fn from_secrets(secrets: &ProviderSecrets) -> Result<Self, OAuthError> {
        let p = &secrets.primary;
        let client = ProviderClient::new(
            &p.client_id,
            &p.client_secret,
            &p.authorize_url,
            &p.access_token_url,
            &p.callback_url,
            PRIMARY_SCOPES,
        )?;
        let default_return_to = parse_url(&p.callback_url)?
            .join("/")
            .map_err(|e| invalid_url(&p.callback_url, e))?
            .to_string();
        Ok(Self {
            client,
            client_id: p.client_id.clone(),
            userinfo_url: join_path(&p.api_base_url, "userinfo")?,
            logout_url: join_path(&p.api_base_url, "v2/logout")?,
            default_return_to,
        })
    }

    pub async fn fetch_identity(
        &self,
        http: &Client,
        access_token: &AccessToken,
    ) -> Result<InternalIdentity, OAuthError> {
        let info: PrimaryUserInfo = fetch_json(http, self.userinfo_url.clone(), access_token).await?;
        Ok(info.into())
    }

    /// Provider-side logout, returning to `return_to` or the site root.
    pub fn logout_url(&self, return_to: Option<&str>) -> Url {
        let mut url = self.logout_url.clone();
        url.query_pairs_mut()
            .append_pair("returnTo", return_to.unwrap_or(&self.default_return_to))
            .append_pair("client_id", &self.client_id);
        url
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Discord
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const DISCORD_SCOPES: &[&str] = &["identify"];

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    #[serde(default)]
    discriminator: Option<String>,
}

impl From<DiscordUser> for ExternalIdentity {
    fn from(user: DiscordUser) -> Self {
        ExternalIdentity {
            external_id: user.id,
            username: user.username,
            discriminator: user.discriminator.unwrap_or_else(|| "0".into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscordProvider {
    pub client: ProviderClient,
    me_url: Url,
}

impl DiscordProvider {
    pub fn new(cfg: &DiscordConfig, secrets: &ProviderSecrets) -> Result<Self, OAuthError> {
        let d = &secrets.discord;
        Ok(Self {
            client: ProviderClient::new(
                &d.client_id,
                &d.client_secret,
                &cfg.authorize_url,
                &cfg.token_url,
                &d.redirect_uri,
                DISCORD_SCOPES,
            )?,
            me_url: join_path(&cfg.api_base, "users/@me")?,
        })
    }

    pub async fn fetch_identity(
        &self,
        http: &Client,
        access_token: &AccessToken,
    ) -> Result<ExternalIdentity, OAuthError> {
        let user: DiscordUser = fetch_json(http, self.me_url.clone(), access_token).await?;
        Ok(user.into())
    }
}

/// Shared client for the login flows.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
}
