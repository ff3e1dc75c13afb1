//! Login, callback and logout handlers for both providers.
//!
//! A login handler stores a fresh CSRF `state` and PKCE verifier in the
//! session and redirects to the provider. The matching callback consumes
//! them, exchanges the code, stores the resulting identity and sends the
//! browser back to `/`.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::PrivateCookieJar;

use crate::oauth::{CallbackParams, OAuthError, ProviderClient};
use crate::session::{LoginFlow, PendingLogin};
use crate::state::AppState;

const LOGIN_FAILED: &str = "Login failed. Please close this window and try again.";

/// `GET /login_auth0`
pub async fn login_primary(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    begin_login(&state, jar, LoginFlow::Primary, &state.primary.client)
}

/// `GET /login_discord`
pub async fn login_discord(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    begin_login(&state, jar, LoginFlow::Discord, &state.discord.client)
}

fn begin_login(
    state: &AppState,
    jar: PrivateCookieJar,
    flow: LoginFlow,
    client: &ProviderClient,
) -> Response {
    let start = client.begin();
    let mut data = state.session.load(&jar);
    data.pending = Some(PendingLogin {
        flow,
        state: start.csrf.secret().clone(),
        pkce_verifier: start.pkce_verifier.secret().clone(),
    });
    let jar = state.session.store(jar, &data);
    (jar, Redirect::to(start.url.as_str())).into_response()
}

/// `GET /callback_auth0`
pub async fn callback_primary(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut data = state.session.load(&jar);
    let result = async {
        let verifier = verify_state(&mut data, LoginFlow::Primary, &params)?;
        let token = state
            .primary
            .client
            .exchange_code(params.code()?, &verifier)
            .await?;
        state.primary.fetch_identity(&state.http, &token).await
    }
    .await;

    match result {
        Ok(identity) => {
            tracing::info!(user_id = %identity.user_id, "primary login completed");
            data.profile = Some(identity);
            let jar = state.session.store(jar, &data);
            (jar, Redirect::to("/")).into_response()
        }
        Err(e) => login_failed(&state, jar, &data, LoginFlow::Primary, e),
    }
}

/// `GET /callback_discord`
pub async fn callback_discord(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut data = state.session.load(&jar);
    let result = async {
        let verifier = verify_state(&mut data, LoginFlow::Discord, &params)?;
        let token = state
            .discord
            .client
            .exchange_code(params.code()?, &verifier)
            .await?;
        state.discord.fetch_identity(&state.http, &token).await
    }
    .await;

    match result {
        Ok(identity) => {
            tracing::info!(external_id = %identity.external_id, "Discord login completed");
            data.discord = Some(identity);
            let jar = state.session.store(jar, &data);
            (jar, Redirect::to("/")).into_response()
        }
        Err(e) => login_failed(&state, jar, &data, LoginFlow::Discord, e),
    }
}

/// `GET /logout_auth0`
pub async fn logout_primary(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let jar = state.session.clear(jar);
    let target = state
        .primary
        .logout_url(state.config.links.logout_return_to.as_deref());
    (jar, Redirect::to(target.as_str())).into_response()
}

fn verify_state(
    data: &mut crate::session::SessionData,
    flow: LoginFlow,
    params: &CallbackParams,
) -> Result<String, OAuthError> {
    let returned = params.state.as_deref().unwrap_or_default();
    data.take_pending(flow, returned).ok_or(OAuthError::InvalidState)
}

/// The pending state is already consumed; store the session so it cannot
/// be replayed.
fn login_failed(
    state: &AppState,
    jar: PrivateCookieJar,
    data: &crate::session::SessionData,
    flow: LoginFlow,
    err: OAuthError,
) -> Response {
    let status = match err {
        OAuthError::InvalidState | OAuthError::MissingCode | OAuthError::Denied(_) => {
            tracing::warn!(flow = ?flow, error = %err, "login rejected");
            StatusCode::BAD_REQUEST
        }
        _ => {
            tracing::error!(flow = ?flow, error = %err, "login failed");
            StatusCode::BAD_GATEWAY
        }
    };
    let jar = state.session.store(jar, data);
    (jar, (status, LOGIN_FAILED)).into_response()
}
