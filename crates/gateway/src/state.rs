use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use lb_domain::config::Config;

use crate::oauth::{DiscordProvider, PrimaryProvider};
use crate::runtime::{LinkOrchestrator, Notifier};
use crate::session::SessionCookie;

/// Shared application state passed to all handlers.
///
/// Everything here is built once at startup and is read-only afterwards;
/// per-user state lives in the session cookie.
#[derive(Clone)]
pub struct AppState {
    // ── Core ──────────────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub orchestrator: Arc<LinkOrchestrator>,
    /// Same notifier the orchestrator holds; `/update_hook` posts through it.
    pub notifier: Arc<dyn Notifier>,

    // ── Login providers ───────────────────────────────────────────────
    pub primary: Arc<PrimaryProvider>,
    pub discord: Arc<DiscordProvider>,
    pub http: reqwest::Client,

    // ── Session ───────────────────────────────────────────────────────
    pub session: Arc<SessionCookie>,
    /// Encrypts the session cookie; derived from `SECRET_KEY`.
    pub cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
