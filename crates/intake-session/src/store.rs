use crate::session::{Session, SessionState};
use chrono::Utc;
use intake_core::{FileRecord, FolderRef, IntakeError, IntakeResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Process-wide table of session state.
///
/// All mutations are atomic with respect to each other. [`try_transition`] is
/// the only way into [`SessionState::DispatchInFlight`].
///
/// [`try_transition`]: SessionStore::try_transition
pub trait SessionStore: Send + Sync {
    /// Registers a new session in [`SessionState::Created`].
    ///
    /// Fails with `InvalidInput` when email or goal is blank or the id is taken.
    fn create(
        &self,
        id: String,
        email: &str,
        goal: &str,
        folder: FolderRef,
    ) -> IntakeResult<Session>;

    /// Returns a snapshot of the session.
    fn get(&self, id: &str) -> IntakeResult<Session>;

    /// Replaces the file list wholesale.
    ///
    /// A `Created` session with a non-empty list moves to `FilesReady` in the
    /// same critical section.
    fn replace_files(&self, id: &str, files: Vec<FileRecord>) -> IntakeResult<Session>;

    /// Stores a fresh folder listing.
    ///
    /// Like [`replace_files`](SessionStore::replace_files), except that an
    /// empty listing leaves a non-empty stored list untouched. The check runs
    /// against the stored list, inside the same critical section.
    fn apply_listing(&self, id: &str, files: Vec<FileRecord>) -> IntakeResult<Session>;

    /// Atomic compare-and-swap on the session state.
    ///
    /// Returns `false`, with no side effects, if the session is missing, is not
    /// in `expected`, or `expected -> next` is not a lifecycle edge.
    fn try_transition(&self, id: &str, expected: SessionState, next: SessionState) -> bool;

    /// Stores the error that failed the most recent delivery.
    fn record_failure(&self, id: &str, error: &str) -> IntakeResult<()>;

    /// Drops sessions idle for longer than `max_idle`. In-flight sessions are kept.
    fn evict_idle(&self, max_idle: Duration) -> usize;

    /// Number of sessions currently held.
    fn len(&self) -> usize;

    /// Whether the store holds no sessions.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory session store guarded by a single lock.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(id: &str) -> IntakeError {
    IntakeError::NotFound(format!("session '{id}'"))
}

fn store_files(id: &str, session: &mut Session, files: Vec<FileRecord>) -> IntakeResult<Session> {
    session.files = files;
    if session.state == SessionState::Created && !session.files.is_empty() {
        session.state = SessionState::FilesReady;
        debug!(session_id = %id, "Session has files");
    }
    session.touch();
    Ok(session.clone())
}

impl SessionStore for InMemorySessionStore {
    fn create(
        &self,
        id: String,
        email: &str,
        goal: &str,
        folder: FolderRef,
    ) -> IntakeResult<Session> {
        let email = email.trim();
        let goal = goal.trim();
        if email.is_empty() || goal.is_empty() {
            return Err(IntakeError::InvalidInput("Missing email or goal".into()));
        }
        if id.is_empty() {
            return Err(IntakeError::InvalidInput("Session id must not be empty".into()));
        }

        let mut sessions = self.sessions.write();
        if sessions.contains_key(&id) {
            return Err(IntakeError::InvalidInput(format!(
                "Session id '{id}' is already in use"
            )));
        }
        let session = Session::new(id.clone(), email.to_string(), goal.to_string(), folder);
        sessions.insert(id, session.clone());
        info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    fn get(&self, id: &str) -> IntakeResult<Session> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    fn replace_files(&self, id: &str, files: Vec<FileRecord>) -> IntakeResult<Session> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        store_files(id, session, files)
    }

    fn apply_listing(&self, id: &str, files: Vec<FileRecord>) -> IntakeResult<Session> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        if files.is_empty() && !session.files.is_empty() {
            debug!(
                session_id = %id,
                kept = session.files.len(),
                "Empty listing ignored, keeping previous snapshot"
            );
            return Ok(session.clone());
        }
        store_files(id, session, files)
    }

    fn try_transition(&self, id: &str, expected: SessionState, next: SessionState) -> bool {
        if !expected.can_transition_to(next) {
            return false;
        }
        let mut sessions = self.sessions.write();
        let Some(session) = sessions.get_mut(id) else {
            return false;
        };
        if session.state != expected {
            return false;
        }
        session.state = next;
        if next == SessionState::DispatchInFlight {
            session.last_dispatch_attempt = Some(Utc::now());
            session.last_error = None;
        }
        session.touch();
        debug!(session_id = %id, from = %expected, to = %next, "Session transitioned");
        true
    }

    fn record_failure(&self, id: &str, error: &str) -> IntakeResult<()> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(id).ok_or_else(|| not_found(id))?;
        session.last_error = Some(error.to_string());
        session.touch();
        Ok(())
    }

    fn evict_idle(&self, max_idle: Duration) -> usize {
        let Ok(max_idle) = chrono::Duration::from_std(max_idle) else {
            return 0;
        };
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| {
            s.state == SessionState::DispatchInFlight || s.updated_at > cutoff
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
