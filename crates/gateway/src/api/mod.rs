pub mod auth;
pub mod health;
pub mod hooks;
pub mod link;

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full router, with request tracing and panic capture.
pub fn router() -> Router<AppState> {
    Router::new()
        // Link flow
        .route("/", get(link::index))
        // Primary identity provider
        .route("/login_auth0", get(auth::login_primary))
        .route("/callback_auth0", get(auth::callback_primary))
        .route("/logout_auth0", get(auth::logout_primary))
        // Discord
        .route("/login_discord", get(auth::login_discord))
        .route("/callback_discord", get(auth::callback_discord))
        // Provider post-update action
        .route("/update_hook", post(hooks::update_hook))
        .route("/health", get(health::health))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "unknown panic payload".to_owned()
    };
    tracing::error!(panic = %detail, "handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, link::ERROR_MESSAGE).into_response()
}
