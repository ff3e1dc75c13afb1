use serde::Serialize;

/// Structured trace events emitted across all LinkBridge crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    DirectoryCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    ManagementTokenIssued {
        expires_in: u64,
    },
    LinkDecided {
        user_id: Option<String>,
        external_id: Option<String>,
        outcome: String,
    },
    LinkWritten {
        user_id: String,
        external_id: String,
        backend: String,
    },
    WebhookAttempt {
        external_id: String,
        attempt: u32,
        status: u16,
    },
    WebhookFinished {
        external_id: String,
        attempts: u32,
        delivered: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "lb_event");
    }
}
