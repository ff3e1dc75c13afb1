use serde::{Deserialize, Serialize};

/// The account a user signed into through the primary identity provider.
///
/// Built once per session from the provider's userinfo response
/// (`sub`, `name`, `picture`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalIdentity {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: String,
}

/// The chat-platform account being linked (`/users/@me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub external_id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
}

impl ExternalIdentity {
    /// `username#discriminator`, as shown in the success message.
    pub fn tag(&self) -> String {
        format!("{}#{}", self.username, self.discriminator)
    }
}

/// Ephemeral event that drives a single webhook post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub external_id: String,
}

impl NotificationEvent {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
        }
    }

    /// Chat message announcing the account update; the bot listening on
    /// the channel reacts to the `a~update` prefix.
    pub fn message(&self) -> String {
        format!("a~update <@{}>", self.external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_joins_username_and_discriminator() {
        let ext = ExternalIdentity {
            external_id: "42".into(),
            username: "ferris".into(),
            discriminator: "0001".into(),
        };
        assert_eq!(ext.tag(), "ferris#0001");
    }

    #[test]
    fn notification_message_mentions_user() {
        let ev = NotificationEvent::new("1234567890");
        assert_eq!(ev.message(), "a~update <@1234567890>");
    }

    #[test]
    fn internal_identity_tolerates_missing_avatar() {
        let json = r#"{"user_id":"auth0|abc","display_name":"Ada"}"#;
        let id: InternalIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(id.avatar_url, "");
    }
}
