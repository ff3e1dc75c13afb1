//! The link decision.
//!
//! Given whatever identities the session holds, decide the next step:
//! send the user to a login, refuse a conflicting link, or write the link
//! and announce it. Every terminal outcome asks the caller to clear the
//! session; only the two login redirects keep it.

use std::sync::Arc;

use lb_directory::{AccountLookup, Directory, LinkWriter};
use lb_domain::identity::{ExternalIdentity, InternalIdentity, NotificationEvent};
use lb_domain::trace::TraceEvent;

use super::notify::Notifier;

/// Identities collected so far in one browser session.
#[derive(Debug, Clone, Default)]
pub struct LinkContext {
    pub internal: Option<InternalIdentity>,
    pub external: Option<ExternalIdentity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    RedirectToPrimaryLogin,
    RedirectToSecondaryLogin,
    /// One side of the pair is already linked to someone else.
    RedirectToConflictHelp,
    Linked {
        display_name: String,
        /// `username#discriminator` of the chat account.
        external_tag: String,
    },
    /// Details stay in the logs; the user sees a generic message.
    Failed,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::RedirectToPrimaryLogin => "primary_login",
            Outcome::RedirectToSecondaryLogin => "secondary_login",
            Outcome::RedirectToConflictHelp => "conflict",
            Outcome::Linked { .. } => "linked",
            Outcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDirective {
    Keep,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDecision {
    pub outcome: Outcome,
    pub session: SessionDirective,
}

impl LinkDecision {
    fn keep(outcome: Outcome) -> Self {
        Self {
            outcome,
            session: SessionDirective::Keep,
        }
    }

    fn clear(outcome: Outcome) -> Self {
        Self {
            outcome,
            session: SessionDirective::Clear,
        }
    }
}

pub struct LinkOrchestrator {
    lookup: Arc<dyn AccountLookup>,
    writer: Arc<dyn LinkWriter>,
    notifier: Arc<dyn Notifier>,
}

impl LinkOrchestrator {
    pub fn new(directory: Directory, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            lookup: directory.lookup,
            writer: directory.writer,
            notifier,
        }
    }

    pub async fn attempt_link(&self, ctx: &LinkContext) -> LinkDecision {
        let decision = self.decide(ctx).await;
        TraceEvent::LinkDecided {
            user_id: ctx.internal.as_ref().map(|i| i.user_id.clone()),
            external_id: ctx.external.as_ref().map(|e| e.external_id.clone()),
            outcome: decision.outcome.label().to_owned(),
        }
        .emit();
        decision
    }

    async fn decide(&self, ctx: &LinkContext) -> LinkDecision {
        let Some(internal) = &ctx.internal else {
            return LinkDecision::keep(Outcome::RedirectToPrimaryLogin);
        };

        let account = match self.lookup.find_by_internal_id(&internal.user_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                tracing::warn!(user_id = %internal.user_id, "no account record for signed-in user");
                return LinkDecision::clear(Outcome::Failed);
            }
            Err(e) => {
                tracing::error!(
                    user_id = %internal.user_id,
                    transport = e.is_transport(),
                    error = %e,
                    "account lookup by user id failed"
                );
                return LinkDecision::clear(Outcome::Failed);
            }
        };

        if let Some(existing) = account.linked_external_id() {
            return match &ctx.external {
                Some(external) if external.external_id == existing => {
                    tracing::info!(user_id = %internal.user_id, "accounts already linked");
                    LinkDecision::clear(linked(internal, external))
                }
                _ => {
                    tracing::info!(
                        user_id = %internal.user_id,
                        "account already linked to another chat identity"
                    );
                    LinkDecision::clear(Outcome::RedirectToConflictHelp)
                }
            };
        }

        let Some(external) = &ctx.external else {
            return LinkDecision::keep(Outcome::RedirectToSecondaryLogin);
        };

        match self.lookup.find_by_external_id(&external.external_id).await {
            Ok(Some(holder)) if holder.id != internal.user_id => {
                tracing::info!(
                    external_id = %external.external_id,
                    "chat identity already linked to another account"
                );
                return LinkDecision::clear(Outcome::RedirectToConflictHelp);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    external_id = %external.external_id,
                    transport = e.is_transport(),
                    error = %e,
                    "account lookup by chat id failed"
                );
                return LinkDecision::clear(Outcome::Failed);
            }
        }

        if let Err(e) = self
            .writer
            .write(&internal.user_id, &external.external_id)
            .await
        {
            tracing::error!(
                user_id = %internal.user_id,
                external_id = %external.external_id,
                backend = self.writer.backend(),
                error = %e,
                "link write failed"
            );
            return LinkDecision::clear(Outcome::Failed);
        }

        TraceEvent::LinkWritten {
            user_id: internal.user_id.clone(),
            external_id: external.external_id.clone(),
            backend: self.writer.backend().to_owned(),
        }
        .emit();
        self.notifier
            .notify(NotificationEvent::new(external.external_id.clone()));

        LinkDecision::clear(linked(internal, external))
    }
}

fn linked(internal: &InternalIdentity, external: &ExternalIdentity) -> Outcome {
    Outcome::Linked {
        display_name: internal.display_name.clone(),
        external_tag: external.tag(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use lb_directory::{AccountRecord, InMemoryDirectory};
    use lb_domain::error::{Error, Result};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingNotifier {
        events: Mutex<Vec<NotificationEvent>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, event: NotificationEvent) {
            self.events.lock().push(event);
        }
    }

    /// Lookup that fails one or both queries and counts calls.
    #[derive(Default)]
    struct FailingLookup {
        fail_internal: bool,
        fail_external: bool,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl AccountLookup for FailingLookup {
        async fn find_by_internal_id(&self, user_id: &str) -> Result<Option<AccountRecord>> {
            *self.calls.lock() += 1;
            if self.fail_internal {
                return Err(Error::Timeout("account service".into()));
            }
            Ok(Some(AccountRecord::unlinked(user_id)))
        }

        async fn find_by_external_id(&self, _external_id: &str) -> Result<Option<AccountRecord>> {
            *self.calls.lock() += 1;
            if self.fail_external {
                return Err(Error::Directory("getUser: boom".into()));
            }
            Ok(None)
        }
    }

    struct RejectingWriter;

    #[async_trait]
    impl LinkWriter for RejectingWriter {
        fn backend(&self) -> &'static str {
            "rejecting"
        }

        async fn write(&self, _user_id: &str, _external_id: &str) -> Result<()> {
            Err(Error::Directory("linkDiscord rejected".into()))
        }
    }

    struct Harness {
        dir: Arc<InMemoryDirectory>,
        notifier: Arc<RecordingNotifier>,
        orchestrator: LinkOrchestrator,
    }

    fn harness(accounts: impl IntoIterator<Item = AccountRecord>) -> Harness {
        let dir = Arc::new(InMemoryDirectory::with_accounts(accounts));
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = LinkOrchestrator::new(
            Directory {
                lookup: dir.clone(),
                writer: dir.clone(),
            },
            notifier.clone(),
        );
        Harness {
            dir,
            notifier,
            orchestrator,
        }
    }

    fn internal(id: &str) -> InternalIdentity {
        InternalIdentity {
            user_id: id.into(),
            display_name: "Ada Lovelace".into(),
            avatar_url: String::new(),
        }
    }

    fn external(id: &str) -> ExternalIdentity {
        ExternalIdentity {
            external_id: id.into(),
            username: "ada".into(),
            discriminator: "1815".into(),
        }
    }

    fn ctx(i: Option<&str>, e: Option<&str>) -> LinkContext {
        LinkContext {
            internal: i.map(internal),
            external: e.map(external),
        }
    }

    fn linked_record(id: &str, discord: &str) -> AccountRecord {
        AccountRecord {
            discord_id: Some(discord.into()),
            ..AccountRecord::unlinked(id)
        }
    }

    #[tokio::test]
    async fn no_primary_identity_redirects_without_lookups() {
        let lookup = Arc::new(FailingLookup {
            fail_internal: true,
            ..FailingLookup::default()
        });
        let orchestrator = LinkOrchestrator::new(
            Directory {
                lookup: lookup.clone(),
                writer: Arc::new(RejectingWriter),
            },
            Arc::new(RecordingNotifier::default()),
        );

        let decision = orchestrator.attempt_link(&ctx(None, Some("d1"))).await;

        assert_eq!(decision.outcome, Outcome::RedirectToPrimaryLogin);
        assert_eq!(decision.session, SessionDirective::Keep);
        assert_eq!(*lookup.calls.lock(), 0);
    }

    #[tokio::test]
    async fn unlinked_account_without_chat_identity_goes_to_discord_login() {
        let h = harness([AccountRecord::unlinked("u1")]);
        let decision = h.orchestrator.attempt_link(&ctx(Some("u1"), None)).await;
        assert_eq!(decision.outcome, Outcome::RedirectToSecondaryLogin);
        assert_eq!(decision.session, SessionDirective::Keep);
    }

    #[tokio::test]
    async fn fresh_pair_is_written_and_announced_once() {
        let h = harness([AccountRecord::unlinked("u1")]);

        let decision = h.orchestrator.attempt_link(&ctx(Some("u1"), Some("d1"))).await;

        assert_eq!(
            decision.outcome,
            Outcome::Linked {
                display_name: "Ada Lovelace".into(),
                external_tag: "ada#1815".into(),
            }
        );
        assert_eq!(decision.session, SessionDirective::Clear);
        assert_eq!(h.dir.get("u1").unwrap().linked_external_id(), Some("d1"));
        assert_eq!(*h.notifier.events.lock(), vec![NotificationEvent::new("d1")]);
    }

    #[tokio::test]
    async fn account_linked_elsewhere_is_a_conflict() {
        let h = harness([linked_record("u1", "d-other")]);

        let decision = h.orchestrator.attempt_link(&ctx(Some("u1"), Some("d1"))).await;

        assert_eq!(decision.outcome, Outcome::RedirectToConflictHelp);
        assert_eq!(decision.session, SessionDirective::Clear);
        assert_eq!(h.dir.get("u1").unwrap().linked_external_id(), Some("d-other"));
        assert!(h.notifier.events.lock().is_empty());
    }

    #[tokio::test]
    async fn linked_account_before_discord_login_is_a_conflict() {
        let h = harness([linked_record("u1", "d1")]);
        let decision = h.orchestrator.attempt_link(&ctx(Some("u1"), None)).await;
        assert_eq!(decision.outcome, Outcome::RedirectToConflictHelp);
        assert_eq!(decision.session, SessionDirective::Clear);
    }

    #[tokio::test]
    async fn chat_identity_held_by_another_account_is_a_conflict() {
        let h = harness([AccountRecord::unlinked("u1"), linked_record("u2", "d1")]);

        let decision = h.orchestrator.attempt_link(&ctx(Some("u1"), Some("d1"))).await;

        assert_eq!(decision.outcome, Outcome::RedirectToConflictHelp);
        assert!(h.dir.get("u1").unwrap().linked_external_id().is_none());
        assert!(h.notifier.events.lock().is_empty());
    }

    #[tokio::test]
    async fn relinking_same_pair_succeeds_without_write_or_notification() {
        let h = harness([linked_record("u1", "d1")]);

        let decision = h.orchestrator.attempt_link(&ctx(Some("u1"), Some("d1"))).await;

        assert!(matches!(decision.outcome, Outcome::Linked { .. }));
        assert_eq!(decision.session, SessionDirective::Clear);
        assert!(h.notifier.events.lock().is_empty());
        assert_eq!(h.dir.link_count(), 1);
    }

    #[tokio::test]
    async fn missing_account_record_fails_and_clears() {
        let h = harness(Vec::<AccountRecord>::new());
        let decision = h.orchestrator.attempt_link(&ctx(Some("ghost"), Some("d1"))).await;
        assert_eq!(decision.outcome, Outcome::Failed);
        assert_eq!(decision.session, SessionDirective::Clear);
        assert_eq!(h.dir.link_count(), 0);
    }

    #[tokio::test]
    async fn lookup_errors_fail_without_writing() {
        for (fail_internal, fail_external) in [(true, false), (false, true)] {
            let lookup = Arc::new(FailingLookup {
                fail_internal,
                fail_external,
                ..FailingLookup::default()
            });
            let dir = Arc::new(InMemoryDirectory::open());
            let notifier = Arc::new(RecordingNotifier::default());
            let orchestrator = LinkOrchestrator::new(
                Directory {
                    lookup,
                    writer: dir.clone(),
                },
                notifier.clone(),
            );

            let decision = orchestrator.attempt_link(&ctx(Some("u1"), Some("d1"))).await;

            assert_eq!(decision.outcome, Outcome::Failed);
            assert_eq!(decision.session, SessionDirective::Clear);
            assert_eq!(dir.link_count(), 0);
            assert!(notifier.events.lock().is_empty());
        }
    }

    #[tokio::test]
    async fn write_failure_is_generic_and_silent() {
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = LinkOrchestrator::new(
            Directory {
                lookup: Arc::new(FailingLookup::default()),
                writer: Arc::new(RejectingWriter),
            },
            notifier.clone(),
        );

        let decision = orchestrator.attempt_link(&ctx(Some("u1"), Some("d1"))).await;

        assert_eq!(decision.outcome, Outcome::Failed);
        assert_eq!(decision.session, SessionDirective::Clear);
        assert!(notifier.events.lock().is_empty());
    }
}
