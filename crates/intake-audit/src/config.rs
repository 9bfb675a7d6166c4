use crate::jsonl::JsonlAuditSink;
use crate::memory::MemoryAuditSink;
use crate::sink::AuditSink;
use crate::webhook::WebhookAuditSink;
use intake_core::{IntakeError, IntakeResult};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Which sink backs the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    /// `<data_dir>/audit/audit.jsonl`
    #[default]
    Jsonl,
    /// HTTP POST to `url`.
    Webhook,
    /// Process memory only.
    Memory,
}

/// `[audit]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Sink backing the trail.
    #[serde(default)]
    pub kind: AuditKind,
    /// Collector endpoint, required for [`AuditKind::Webhook`].
    #[serde(default)]
    pub url: Option<String>,
    /// Per-request timeout for the webhook sink.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            kind: AuditKind::default(),
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AuditConfig {
    /// Builds the configured sink. JSONL logs go under `data_dir/audit`.
    /// Must be called inside a Tokio runtime.
    pub fn build(&self, data_dir: &Path) -> IntakeResult<Arc<dyn AuditSink>> {
        let sink: Arc<dyn AuditSink> = match self.kind {
            AuditKind::Jsonl => Arc::new(JsonlAuditSink::new(data_dir.join("audit"))),
            AuditKind::Webhook => {
                let url = self
                    .url
                    .as_deref()
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| {
                        IntakeError::Config("audit.url is required for the webhook sink".into())
                    })?;
                Arc::new(WebhookAuditSink::new(
                    url,
                    Duration::from_secs(self.timeout_secs),
                )?)
            }
            AuditKind::Memory => Arc::new(MemoryAuditSink::new()),
        };
        Ok(sink)
    }
}
