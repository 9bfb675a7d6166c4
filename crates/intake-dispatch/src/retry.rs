use crate::delivery::{Deliver, DispatchPayload};
use async_trait::async_trait;
use intake_core::{IntakeError, IntakeResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Type alias for the injectable sleep function used in tests.
#[cfg(test)]
type SleepFn = Box<
    dyn Fn(u64) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send + Sync,
>;

/// Configures retry behaviour for downstream delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds (cap for exponential backoff).
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

/// Whether a failed delivery is worth another attempt.
///
/// Timeouts, connection failures and 5xx responses are classified as
/// `Transient` by the deliverer; everything else is final.
pub fn is_retryable(err: &IntakeError) -> bool {
    err.is_transient()
}

/// Delay before the attempt following `attempt` (zero-based), capped at
/// `backoff_max_ms`.
pub fn compute_backoff(policy: &RetryPolicy, attempt: u32) -> u64 {
    let delay = policy
        .backoff_base_ms
        .saturating_mul(2u64.saturating_pow(attempt));
    delay.min(policy.backoff_max_ms)
}

/// A [`Deliver`] wrapper that retries transient failures with exponential
/// backoff.
pub struct RetryingDeliverer {
    inner: std::sync::Arc<dyn Deliver>,
    policy: RetryPolicy,
    /// Injectable sleep function for testing (allows skipping real delays).
    #[cfg(test)]
    sleep_fn: Option<SleepFn>,
}

impl RetryingDeliverer {
    pub fn new(inner: std::sync::Arc<dyn Deliver>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            #[cfg(test)]
            sleep_fn: None,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn do_sleep(&self, ms: u64) {
        #[cfg(test)]
        if let Some(ref f) = self.sleep_fn {
            f(ms).await;
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

#[async_trait]
impl Deliver for RetryingDeliverer {
    async fn deliver(&self, payload: &DispatchPayload) -> IntakeResult<()> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_err: Option<IntakeError> = None;

        for attempt in 0..attempts {
            match self.inner.deliver(payload).await {
                Ok(()) => {
                    if attempt > 0 {
                        info!(session_id = %payload.session_id, attempt, "Delivery succeeded after retry");
                    }
                    return Ok(());
                }
                Err(e) => {
                    if !is_retryable(&e) {
                        warn!(
                            session_id = %payload.session_id,
                            attempt,
                            error = %e,
                            "Non-retryable delivery error"
                        );
                        return Err(e);
                    }

                    if attempt + 1 < attempts {
                        let delay = compute_backoff(&self.policy, attempt);
                        info!(
                            session_id = %payload.session_id,
                            attempt,
                            delay_ms = delay,
                            error = %e,
                            "Retryable delivery error, backing off"
                        );
                        self.do_sleep(delay).await;
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| IntakeError::Transient("delivery attempts exhausted".into())))
    }
}
