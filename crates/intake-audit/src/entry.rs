use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event labels written by the engine.
pub mod events {
    /// A session and its folder were created.
    pub const SESSION_CREATED: &str = "Session Created";
    /// The session folder was listed on request.
    pub const FILES_LISTED: &str = "Files Listed";
    /// The downstream processor accepted the file set.
    pub const ASSESSMENT_TRIGGERED: &str = "Assessment Triggered";
    /// Delivery failed after retries or past its deadline.
    pub const ASSESSMENT_TRIGGER_FAILED: &str = "Assessment Trigger Failed";
}

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the entry was created.
    pub timestamp: DateTime<Utc>,
    /// Session the event belongs to.
    pub session_id: String,
    /// Email of the session owner.
    pub email: String,
    /// Goal given when the session was opened.
    pub goal: String,
    /// Display URL of the session folder.
    pub folder_url: String,
    /// Free-text label, usually one of [`events`].
    pub event: String,
}

impl AuditEntry {
    /// Builds an entry stamped with the current time.
    pub fn new(
        session_id: impl Into<String>,
        email: impl Into<String>,
        goal: impl Into<String>,
        folder_url: impl Into<String>,
        event: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id.into(),
            email: email.into(),
            goal: goal.into(),
            folder_url: folder_url.into(),
            event: event.into(),
        }
    }
}
