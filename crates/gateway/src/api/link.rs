//! `GET /`: run the link flow for the current session.

use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::PrivateCookieJar;
use lb_domain::config::LinksConfig;

use crate::runtime::{Outcome, SessionDirective};
use crate::state::AppState;

pub const ERROR_MESSAGE: &str = "An unhandled error occurred linking your accounts. \
     Please contact a staff member so we can resolve the issue.";

pub async fn index(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let ctx = state.session.load(&jar).link_context();
    let decision = state.orchestrator.attempt_link(&ctx).await;

    let jar = match decision.session {
        SessionDirective::Keep => jar,
        SessionDirective::Clear => state.session.clear(jar),
    };
    (jar, render(&state.config.links, &decision.outcome)).into_response()
}

pub fn render(links: &LinksConfig, outcome: &Outcome) -> Response {
    match outcome {
        Outcome::RedirectToPrimaryLogin => Redirect::to("/login_auth0").into_response(),
        Outcome::RedirectToSecondaryLogin => Redirect::to("/login_discord").into_response(),
        Outcome::RedirectToConflictHelp => {
            Redirect::to(&links.conflict_help_url).into_response()
        }
        Outcome::Linked {
            display_name,
            external_tag,
        } => format!(
            "{display_name}'s {label} account has been successfully associated with the \
             Discord account {external_tag}! Please close this window.",
            label = links.account_label,
        )
        .into_response(),
        Outcome::Failed => ERROR_MESSAGE.into_response(),
    }
}
