use crate::delivery::DispatchPayload;
use crate::pool::{settle, DeliveryPool};
use intake_audit::AuditSink;
use intake_core::{FileRecord, IntakeResult};
use intake_session::{Session, SessionState, SessionStore};
use intake_storage::StorageGateway;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of observing a trigger for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOutcome {
    /// This call won the race; a delivery is queued.
    Triggered,
    /// Delivery is in flight or already done.
    AlreadyTriggered,
    /// No files are visible in the session folder yet.
    WaitingForFiles,
    /// The message was not a trigger.
    WaitingForMoreInput,
}

impl TriggerOutcome {
    /// The status string returned to callers.
    pub fn as_status(self) -> &'static str {
        match self {
            TriggerOutcome::Triggered => "triggered",
            TriggerOutcome::AlreadyTriggered => "already_triggered",
            TriggerOutcome::WaitingForFiles => "waiting_for_files",
            TriggerOutcome::WaitingForMoreInput => "waiting_for_more_input",
        }
    }
}

impl fmt::Display for TriggerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_status())
    }
}

/// Decides whether a session's files go downstream, at most once.
pub struct Dispatcher {
    store: Arc<dyn SessionStore>,
    storage: Arc<dyn StorageGateway>,
    audit: Arc<dyn AuditSink>,
    pool: Arc<DeliveryPool>,
    list_timeout: Duration,
    next_action_webhook: Option<String>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given collaborators.
    pub fn new(
        store: Arc<dyn SessionStore>,
        storage: Arc<dyn StorageGateway>,
        audit: Arc<dyn AuditSink>,
        pool: Arc<DeliveryPool>,
        list_timeout: Duration,
        next_action_webhook: Option<String>,
    ) -> Self {
        Self {
            store,
            storage,
            audit,
            pool,
            list_timeout,
            next_action_webhook,
        }
    }

    /// Lists the session folder and stores the classified result.
    ///
    /// An empty listing never replaces a non-empty stored list: the provider's
    /// eventual consistency can hide files that were already seen.
    pub async fn refresh(&self, session: &Session) -> IntakeResult<Session> {
        let remote = self
            .storage
            .list_files(&session.folder, self.list_timeout)
            .await?;
        let files: Vec<FileRecord> = remote.into_iter().map(FileRecord::from).collect();
        let updated = self.store.apply_listing(&session.id, files)?;
        debug!(session_id = %updated.id, files = updated.files.len(), "Files refreshed");
        Ok(updated)
    }

    /// Observes a trigger for `session_id`.
    ///
    /// At most one caller per dispatch round gets [`TriggerOutcome::Triggered`];
    /// the delivery itself runs on the pool.
    pub async fn dispatch(&self, session_id: &str) -> IntakeResult<TriggerOutcome> {
        let mut session = self.store.get(session_id)?;
        if matches!(
            session.state,
            SessionState::DispatchInFlight | SessionState::Dispatched
        ) {
            return Ok(TriggerOutcome::AlreadyTriggered);
        }

        if session.files.is_empty() {
            match self.refresh(&session).await {
                Ok(updated) => session = updated,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "Refresh before dispatch failed");
                }
            }
        }
        if session.files.is_empty() {
            return Ok(TriggerOutcome::WaitingForFiles);
        }

        let observed = session.state;
        if !observed.is_dispatchable() {
            // A concurrent caller moved the session on while we were listing.
            return Ok(TriggerOutcome::AlreadyTriggered);
        }
        if !self
            .store
            .try_transition(session_id, observed, SessionState::DispatchInFlight)
        {
            debug!(session_id = %session_id, "Lost dispatch race");
            return Ok(TriggerOutcome::AlreadyTriggered);
        }

        let payload = DispatchPayload::from_session(&session, self.next_action_webhook.as_deref());
        let files = payload.files.len();
        if let Err(e) = self.pool.submit(payload.clone()) {
            settle(self.store.as_ref(), self.audit.as_ref(), &payload, Err(&e)).await;
            return Err(e);
        }

        info!(session_id = %session_id, files, from = %observed, "Dispatch queued");
        Ok(TriggerOutcome::Triggered)
    }
}
