use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `[dispatch]` section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Downstream processing webhook receiving the payload.
    #[serde(default)]
    pub downstream_url: String,
    /// Forwarded in the payload as the processor's next hop.
    #[serde(default)]
    pub next_action_webhook: Option<String>,
    /// Timeout of a single downstream request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Bound on the whole retry loop of one delivery.
    #[serde(default = "default_delivery_deadline_secs")]
    pub delivery_deadline_secs: u64,
    /// Number of delivery workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Payloads that may wait for a worker.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Backoff between delivery attempts.
    #[serde(default)]
    pub retry_policy: RetryPolicy,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_delivery_deadline_secs() -> u64 {
    120
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            downstream_url: String::new(),
            next_action_webhook: None,
            request_timeout_secs: default_request_timeout_secs(),
            delivery_deadline_secs: default_delivery_deadline_secs(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl DispatchConfig {
    /// Timeout of a single downstream request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bound on the whole retry loop for one payload.
    pub fn delivery_deadline(&self) -> Duration {
        Duration::from_secs(self.delivery_deadline_secs)
    }

    /// The configured follow-up webhook, ignoring blank values.
    pub fn next_action_webhook(&self) -> Option<&str> {
        self.next_action_webhook
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
