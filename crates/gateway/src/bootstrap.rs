//! AppState construction extracted from `main.rs`, shared by `serve` and
//! the router tests.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use lb_directory::create_directory;
use lb_domain::config::{Config, ConfigSeverity, ProviderSecrets};

use crate::oauth::{self, DiscordProvider, PrimaryProvider};
use crate::runtime::{LinkOrchestrator, Notifier, WebhookNotifier};
use crate::session::{derive_cookie_key, SessionCookie};
use crate::state::AppState;

/// Validate config, wire every component and return the [`AppState`].
pub fn build_app_state(config: Arc<Config>, secrets: &ProviderSecrets) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Directory ────────────────────────────────────────────────────
    let directory =
        create_directory(&config.directory, secrets).context("creating account directory")?;
    tracing::info!(
        backend = %config.directory.backend,
        writer = directory.writer.backend(),
        "account directory ready"
    );

    // ── Notifier ─────────────────────────────────────────────────────
    let webhook = WebhookNotifier::from_config(&config.notify, secrets.webhook_url.as_deref())
        .context("creating webhook notifier")?;
    if webhook.is_enabled() {
        tracing::info!(
            max_attempts = config.notify.max_attempts,
            "webhook notifications enabled"
        );
    } else {
        tracing::warn!("DISCORD_WEBHOOK not set, link notifications disabled");
    }
    let notifier: Arc<dyn Notifier> = Arc::new(webhook);

    // ── Login providers ──────────────────────────────────────────────
    let primary = PrimaryProvider::from_secrets(secrets).context("primary identity provider")?;
    let discord = DiscordProvider::new(&config.discord, secrets).context("Discord provider")?;
    let http = oauth::http_client(Duration::from_millis(config.directory.timeout_ms))
        .context("building login HTTP client")?;

    // ── Session cookie ───────────────────────────────────────────────
    let session = SessionCookie::from_config(&config.server.session);
    if !config.server.session.secure {
        tracing::warn!("session cookie is not marked Secure");
    }

    Ok(AppState {
        orchestrator: Arc::new(LinkOrchestrator::new(directory, notifier.clone())),
        notifier,
        primary: Arc::new(primary),
        discord: Arc::new(discord),
        http,
        session: Arc::new(session),
        cookie_key: derive_cookie_key(&secrets.session_key),
        config,
    })
}
