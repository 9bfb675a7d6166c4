use chrono::{DateTime, Utc};
use intake_core::{FileRecord, FolderRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Where a session is in the dispatch lifecycle.
///
/// ```text
/// Created ──files──► FilesReady ──trigger──► DispatchInFlight ──ok──► Dispatched
///                                                 │    ▲
///                                           failed│    │trigger
///                                                 ▼    │
///                                            DispatchFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Folder exists, no files seen yet.
    Created,
    /// At least one file has been listed.
    FilesReady,
    /// A delivery is queued or running. Only the CAS enters this state.
    DispatchInFlight,
    /// Downstream accepted the files. Terminal.
    Dispatched,
    /// The last delivery failed; a new trigger may retry.
    DispatchFailed,
}

impl SessionState {
    /// Whether `self -> next` is an edge of the lifecycle graph.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Created, FilesReady)
                | (FilesReady, DispatchInFlight)
                | (DispatchInFlight, Dispatched)
                | (DispatchInFlight, DispatchFailed)
                | (DispatchFailed, DispatchInFlight)
        )
    }

    /// States from which a trigger may start a delivery.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, SessionState::FilesReady | SessionState::DispatchFailed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "created",
            SessionState::FilesReady => "files_ready",
            SessionState::DispatchInFlight => "dispatch_in_flight",
            SessionState::Dispatched => "dispatched",
            SessionState::DispatchFailed => "dispatch_failed",
        };
        f.write_str(s)
    }
}

/// One intake workflow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique id, also the storage folder name.
    pub id: String,
    /// Owner email, trimmed.
    pub email: String,
    /// What the client wants assessed.
    pub goal: String,
    /// Handle to the upload folder.
    pub folder: FolderRef,
    /// Latest classified listing.
    pub files: Vec<FileRecord>,
    /// Lifecycle position.
    pub state: SessionState,
    /// Set each time the session enters `DispatchInFlight`.
    pub last_dispatch_attempt: Option<DateTime<Utc>>,
    /// Error from the delivery that moved the session to `DispatchFailed`.
    #[serde(default)]
    pub last_error: Option<String>,
    /// When the session was opened.
    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation; drives idle eviction.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(id: String, email: String, goal: String, folder: FolderRef) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            goal,
            folder,
            files: Vec::new(),
            state: SessionState::Created,
            last_dispatch_attempt: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of files in the latest listing.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Allocates a session id of the form `Temp_<yyyymmddHHMMSS>_<email>_<suffix>`.
///
/// `@` and `.` in the email become `_`; the random suffix keeps ids unique when
/// the same address opens several sessions within one second.
pub fn new_session_id(email: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let clean_email: String = email
        .trim()
        .chars()
        .map(|c| match c {
            '@' | '.' => '_',
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '+' => c,
            _ => '_',
        })
        .collect();
    let simple = Uuid::new_v4().simple().to_string();
    let suffix = &simple[..8];
    format!("Temp_{timestamp}_{clean_email}_{suffix}")
}
