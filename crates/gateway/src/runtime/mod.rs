//! Link flow runtime: the decision over both identities, and the webhook
//! notifier it fires on a successful write.

pub mod link;
pub mod notify;

pub use link::{LinkContext, LinkDecision, LinkOrchestrator, Outcome, SessionDirective};
pub use notify::{Notifier, WebhookNotifier};
