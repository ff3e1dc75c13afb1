//! Fire-and-forget chat webhook notifications.
//!
//! A successful link posts `a~update <@id>` to the configured channel so
//! the bot there refreshes the member. Delivery runs on a spawned task and
//! never affects the response the user sees. Only HTTP 429 is retried,
//! after [`RATE_LIMIT_BACKOFF`], up to `notify.max_attempts` requests per
//! event.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lb_directory::from_reqwest;
use lb_domain::config::NotifyConfig;
use lb_domain::error::{Error, Result};
use lb_domain::identity::NotificationEvent;
use lb_domain::trace::TraceEvent;
use reqwest::{Client, StatusCode};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Seams
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Sink for link notifications. Must return without waiting on delivery.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotificationEvent);

    /// Deliveries started but not yet finished.
    fn in_flight(&self) -> usize {
        0
    }
}

/// One HTTP post of a chat message.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, content: &str) -> Result<StatusCode>;
}

/// Discord incoming-webhook transport.
pub struct DiscordWebhook {
    http: Client,
    url: String,
}

impl std::fmt::Debug for DiscordWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The webhook URL embeds its own credential.
        f.debug_struct("DiscordWebhook")
            .field("url", &"[REDACTED]")
            .finish()
    }
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl WebhookTransport for DiscordWebhook {
    async fn post(&self, content: &str) -> Result<StatusCode> {
        let resp = self
            .http
            .post(&self.url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(from_reqwest)?;
        Ok(resp.status())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Delivery
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Pause after a 429 before posting the same message again.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl From<&NotifyConfig> for RetryPolicy {
    fn from(cfg: &NotifyConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&NotifyConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    /// Non-2xx, non-429 answer.
    Rejected { attempts: u32, status: u16 },
    /// The request never got an answer.
    TransportFailed { attempts: u32 },
    /// Still rate limited after the last allowed attempt.
    RateLimited { attempts: u32 },
}

impl DeliveryOutcome {
    pub fn attempts(&self) -> u32 {
        match *self {
            DeliveryOutcome::Delivered { attempts }
            | DeliveryOutcome::Rejected { attempts, .. }
            | DeliveryOutcome::TransportFailed { attempts }
            | DeliveryOutcome::RateLimited { attempts } => attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Post one event, retrying only while the webhook answers 429.
pub async fn deliver(
    transport: &dyn WebhookTransport,
    event: &NotificationEvent,
    policy: &RetryPolicy,
) -> DeliveryOutcome {
    let content = event.message();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let status = match transport.post(&content).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(
                    external_id = %event.external_id,
                    attempt,
                    error = %e,
                    "webhook request failed"
                );
                return DeliveryOutcome::TransportFailed { attempts: attempt };
            }
        };

        TraceEvent::WebhookAttempt {
            external_id: event.external_id.clone(),
            attempt,
            status: status.as_u16(),
        }
        .emit();

        if status.is_success() {
            return DeliveryOutcome::Delivered { attempts: attempt };
        }
        if status != StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(
                external_id = %event.external_id,
                status = status.as_u16(),
                "webhook rejected notification"
            );
            return DeliveryOutcome::Rejected {
                attempts: attempt,
                status: status.as_u16(),
            };
        }
        if attempt >= policy.max_attempts {
            tracing::error!(
                external_id = %event.external_id,
                attempts = attempt,
                "webhook still rate limited, giving up"
            );
            return DeliveryOutcome::RateLimited { attempts: attempt };
        }

        tracing::debug!(attempt, "webhook rate limited, retrying");
        tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Notifier
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Spawns a delivery task per event. With no transport configured every
/// event is dropped.
#[derive(Clone)]
pub struct WebhookNotifier {
    transport: Option<Arc<dyn WebhookTransport>>,
    policy: RetryPolicy,
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight count when a delivery task ends, panics included.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WebhookNotifier {
    pub fn new(transport: Arc<dyn WebhookTransport>, policy: RetryPolicy) -> Self {
        Self {
            transport: Some(transport),
            policy,
            in_flight: Arc::default(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            transport: None,
            policy: RetryPolicy::default(),
            in_flight: Arc::default(),
        }
    }

    /// Discord transport for `webhook_url`, or disabled when unset.
    pub fn from_config(cfg: &NotifyConfig, webhook_url: Option<&str>) -> Result<Self> {
        match webhook_url {
            Some(url) => {
                let transport = DiscordWebhook::new(url, Duration::from_millis(cfg.timeout_ms))?;
                Ok(Self::new(Arc::new(transport), RetryPolicy::from(cfg)))
            }
            None => Ok(Self::disabled()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, event: NotificationEvent) {
        let Some(transport) = self.transport.clone() else {
            tracing::debug!(external_id = %event.external_id, "webhook disabled, notification dropped");
            return;
        };
        let policy = self.policy.clone();
        let guard = InFlight::start(&self.in_flight);

        tokio::spawn(async move {
            let _guard = guard;
            let outcome = deliver(transport.as_ref(), &event, &policy).await;
            TraceEvent::WebhookFinished {
                external_id: event.external_id.clone(),
                attempts: outcome.attempts(),
                delivered: outcome.is_delivered(),
            }
            .emit();
        });
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::*;

    /// Replays a fixed list of answers; `None` is a transport error.
    struct Scripted {
        answers: Mutex<VecDeque<Option<u16>>>,
        calls: Mutex<Vec<(Instant, String)>>,
    }

    impl Scripted {
        fn new(answers: impl IntoIterator<Item = Option<u16>>) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().iter().map(|(t, _)| *t).collect()
        }
    }

    #[async_trait]
    impl WebhookTransport for Scripted {
        async fn post(&self, content: &str) -> Result<StatusCode> {
            self.calls.lock().push((Instant::now(), content.to_owned()));
            match self.answers.lock().pop_front().unwrap_or(Some(200)) {
                Some(code) => Ok(StatusCode::from_u16(code).unwrap()),
                None => Err(Error::Http("connection reset".into())),
            }
        }
    }

    fn event() -> NotificationEvent {
        NotificationEvent::new("80351110224678912")
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_posts_wait_one_second_between_attempts() {
        let transport = Scripted::new([Some(429), Some(429), Some(200)]);
        let start = Instant::now();

        let outcome = deliver(transport.as_ref(), &event(), &RetryPolicy::default()).await;

        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 3 });
        let times = transport.call_times();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_secs(1));
        assert_eq!(times[2] - times[1], Duration::from_secs(1));
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn message_mentions_the_linked_member() {
        let transport = Scripted::new([Some(204)]);
        deliver(transport.as_ref(), &event(), &RetryPolicy::default()).await;
        let calls = transport.calls.lock();
        assert_eq!(calls[0].1, "a~update <@80351110224678912>");
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_are_not_retried() {
        let transport = Scripted::new([Some(500), Some(200)]);
        let outcome = deliver(transport.as_ref(), &event(), &RetryPolicy::default()).await;
        assert_eq!(
            outcome,
            DeliveryOutcome::Rejected {
                attempts: 1,
                status: 500
            }
        );

        let transport = Scripted::new([None, Some(200)]);
        let outcome = deliver(transport.as_ref(), &event(), &RetryPolicy::default()).await;
        assert_eq!(outcome, DeliveryOutcome::TransportFailed { attempts: 1 });
        assert_eq!(transport.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_stops_at_attempt_cap() {
        let transport = Scripted::new(std::iter::repeat(Some(429)).take(50));
        let policy = RetryPolicy { max_attempts: 4 };
        let start = Instant::now();

        let outcome = deliver(transport.as_ref(), &event(), &policy).await;

        assert_eq!(outcome, DeliveryOutcome::RateLimited { attempts: 4 });
        assert_eq!(transport.call_times().len(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn notify_returns_before_delivery_completes() {
        let transport = Scripted::new([Some(429), Some(200)]);
        let notifier = WebhookNotifier::new(transport.clone(), RetryPolicy::default());

        notifier.notify(event());
        assert!(transport.call_times().is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.call_times().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_stays_one_second_whatever_the_config_file_says() {
        let cfg: NotifyConfig =
            toml::from_str("max_attempts = 3\nrate_limit_backoff_ms = 5\n").unwrap();
        let transport = Scripted::new([Some(429), Some(200)]);

        let outcome = deliver(transport.as_ref(), &event(), &RetryPolicy::from(&cfg)).await;

        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 2 });
        let times = transport.call_times();
        assert_eq!(times[1] - times[0], RATE_LIMIT_BACKOFF);
        assert_eq!(RATE_LIMIT_BACKOFF, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_counts_deliveries_until_they_finish() {
        let transport = Scripted::new([Some(429), Some(429), Some(200), Some(200)]);
        let notifier = WebhookNotifier::new(transport.clone(), RetryPolicy::default());
        assert_eq!(notifier.in_flight(), 0);

        notifier.notify(event());
        notifier.notify(NotificationEvent::new("1"));
        assert_eq!(notifier.in_flight(), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(notifier.in_flight(), 0);
        assert_eq!(transport.call_times().len(), 4);
    }

    #[test]
    fn zero_attempt_config_still_posts_once() {
        let cfg = NotifyConfig {
            max_attempts: 0,
            ..NotifyConfig::default()
        };
        assert_eq!(RetryPolicy::from(&cfg).max_attempts, 1);
    }

    #[test]
    fn missing_webhook_url_disables_notifier() {
        let notifier = WebhookNotifier::from_config(&NotifyConfig::default(), None).unwrap();
        assert!(!notifier.is_enabled());
        // Must not panic outside a runtime.
        notifier.notify(event());
    }
}
