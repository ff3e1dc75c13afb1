//! `POST /update_hook`: the identity provider's post-update action calls
//! this when a user's metadata changes, so the chat bot hears about links
//! made outside this service.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lb_domain::identity::NotificationEvent;
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateHookPayload {
    response: HookResponse,
}

#[derive(Debug, Deserialize)]
struct HookResponse {
    body: HookBody,
}

#[derive(Debug, Deserialize)]
struct HookBody {
    user_metadata: HookMetadata,
}

#[derive(Debug, Deserialize)]
struct HookMetadata {
    discord_id: ChatId,
}

/// Snowflakes arrive as strings or, from some callers, as JSON numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatId {
    Text(String),
    Number(u64),
}

impl UpdateHookPayload {
    pub fn discord_id(&self) -> Option<String> {
        match &self.response.body.user_metadata.discord_id {
            ChatId::Text(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
            ChatId::Text(_) => None,
            ChatId::Number(n) => Some(n.to_string()),
        }
    }
}

pub async fn update_hook(
    State(state): State<AppState>,
    payload: Result<Json<UpdateHookPayload>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(p)) => p,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "malformed update hook payload");
            return (StatusCode::BAD_REQUEST, "malformed payload").into_response();
        }
    };
    let Some(discord_id) = payload.discord_id() else {
        return (StatusCode::BAD_REQUEST, "missing discord_id").into_response();
    };

    tracing::info!(external_id = %discord_id, "update hook received");
    state.notifier.notify(NotificationEvent::new(discord_id));
    (StatusCode::OK, "OK").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> UpdateHookPayload {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn string_and_numeric_ids_are_accepted() {
        let p = parse(r#"{"response":{"body":{"user_metadata":{"discord_id":"123"}}}}"#);
        assert_eq!(p.discord_id().as_deref(), Some("123"));
        let p = parse(r#"{"response":{"body":{"user_metadata":{"discord_id":456}}}}"#);
        assert_eq!(p.discord_id().as_deref(), Some("456"));
    }

    #[test]
    fn blank_id_is_rejected() {
        let p = parse(r#"{"response":{"body":{"user_metadata":{"discord_id":"  "}}}}"#);
        assert!(p.discord_id().is_none());
    }

    #[test]
    fn missing_nesting_fails_to_parse() {
        assert!(serde_json::from_str::<UpdateHookPayload>(r#"{"discord_id":"1"}"#).is_err());
    }
}
