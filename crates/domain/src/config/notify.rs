use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Webhook notifications
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Retry policy for the outgoing chat webhook.
///
/// A 429 waits one second and retries the same request; any other failure
/// stops immediately. `max_attempts` bounds the total number of requests
/// per event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "d_10")]
    pub max_attempts: u32,
    #[serde(default = "d_10000")]
    pub timeout_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            timeout_ms: 10_000,
        }
    }
}

fn d_10() -> u32 {
    10
}
fn d_10000() -> u64 {
    10_000
}
