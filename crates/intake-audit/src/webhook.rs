use crate::entry::AuditEntry;
use crate::sink::AuditSink;
use async_trait::async_trait;
use intake_core::{IntakeError, IntakeResult};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// HTTP client for a collector endpoint (e.g. a spreadsheet append script).
#[derive(Clone)]
pub struct WebhookCollector {
    client: reqwest::Client,
    url: String,
}

impl WebhookCollector {
    /// Builds the HTTP client with a per-request `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> IntakeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntakeError::Config(format!("audit HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Posts one entry. 5xx and transport errors are `Transient`.
    pub async fn post(&self, entry: &AuditEntry) -> IntakeResult<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(entry)
            .send()
            .await
            .map_err(|e| IntakeError::Transient(format!("audit POST failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else if status.is_server_error() {
            Err(IntakeError::Transient(format!("audit collector returned {status}")))
        } else {
            Err(IntakeError::Permanent(format!("audit collector returned {status}")))
        }
    }
}

/// Posts each entry as JSON to a [`WebhookCollector`].
///
/// Appends only enqueue; a background task performs the POSTs in append
/// order and logs failures, so a slow or unreachable collector never delays
/// the caller.
pub struct WebhookAuditSink {
    tx: mpsc::UnboundedSender<AuditEntry>,
}

impl WebhookAuditSink {
    /// Spawns the sender task. Must be called inside a Tokio runtime.
    pub fn new(url: impl Into<String>, timeout: Duration) -> IntakeResult<Self> {
        let collector = WebhookCollector::new(url, timeout)?;
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = collector.post(&entry).await {
                    warn!(
                        session_id = %entry.session_id,
                        event = %entry.event,
                        error = %e,
                        "Audit collector rejected entry"
                    );
                }
            }
        });

        Ok(Self { tx })
    }
}

#[async_trait]
impl AuditSink for WebhookAuditSink {
    async fn append(&self, entry: AuditEntry) -> IntakeResult<()> {
        self.tx
            .send(entry)
            .map_err(|_| IntakeError::Transient("audit sender has stopped".into()))
    }
}
