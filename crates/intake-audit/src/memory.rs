use crate::entry::AuditEntry;
use crate::sink::AuditSink;
use async_trait::async_trait;
use intake_core::IntakeResult;
use parking_lot::Mutex;

/// Keeps entries in memory. Useful for embedding and tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in append order.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Event labels recorded for one session, in order.
    pub fn events_for(&self, session_id: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.session_id == session_id)
            .map(|e| e.event.clone())
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: AuditEntry) -> IntakeResult<()> {
        self.entries.lock().push(entry);
        Ok(())
    }
}
