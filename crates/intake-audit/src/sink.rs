use crate::entry::AuditEntry;
use async_trait::async_trait;
use intake_core::IntakeResult;
use tracing::{info, warn};

/// Append-only record of session lifecycle events.
///
/// `append` is awaited on request paths, so implementations hand slow I/O to
/// a background task and return once the entry is queued.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records one entry.
    async fn append(&self, entry: AuditEntry) -> IntakeResult<()>;
}

/// Appends `entry`, logging and swallowing any failure.
pub async fn record_best_effort(sink: &dyn AuditSink, entry: AuditEntry) {
    info!(
        session_id = %entry.session_id,
        event = %entry.event,
        "audit"
    );
    let session_id = entry.session_id.clone();
    let event = entry.event.clone();
    if let Err(e) = sink.append(entry).await {
        warn!(session_id = %session_id, event = %event, error = %e, "Audit append failed");
    }
}
