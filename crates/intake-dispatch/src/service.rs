use crate::config::DispatchConfig;
use crate::delivery::Deliver;
use crate::dispatcher::{Dispatcher, TriggerOutcome};
use crate::pool::{DeliveryContext, DeliveryPool};
use crate::retry::RetryingDeliverer;
use intake_audit::{events, record_best_effort, AuditEntry, AuditSink};
use intake_core::{CommandGrammar, CommandKind, IntakeError, IntakeResult};
use intake_session::{new_session_id, Session, SessionStore};
use intake_storage::StorageGateway;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// External collaborators of the service.
#[derive(Clone)]
pub struct ServiceDeps {
    /// Session table.
    pub store: Arc<dyn SessionStore>,
    /// Folder provider.
    pub storage: Arc<dyn StorageGateway>,
    /// Audit trail.
    pub audit: Arc<dyn AuditSink>,
    /// Single-attempt deliverer; the service wraps it with the retry policy.
    pub deliverer: Arc<dyn Deliver>,
}

/// Facade behind the caller-facing operations: open a session, list its
/// files, react to a message.
pub struct IntakeService {
    store: Arc<dyn SessionStore>,
    storage: Arc<dyn StorageGateway>,
    audit: Arc<dyn AuditSink>,
    dispatcher: Dispatcher,
    pool: Arc<DeliveryPool>,
    grammar: CommandGrammar,
}

impl IntakeService {
    /// Wires the collaborators and starts the delivery workers.
    /// Must be called inside a Tokio runtime.
    pub fn new(
        deps: ServiceDeps,
        config: &DispatchConfig,
        grammar: CommandGrammar,
        list_timeout: Duration,
    ) -> Self {
        let retrying: Arc<dyn Deliver> = Arc::new(RetryingDeliverer::new(
            deps.deliverer,
            config.retry_policy.clone(),
        ));
        let pool = Arc::new(DeliveryPool::start(
            config.workers,
            config.queue_capacity,
            DeliveryContext {
                store: deps.store.clone(),
                deliverer: retrying,
                audit: deps.audit.clone(),
                deadline: config.delivery_deadline(),
            },
        ));
        let dispatcher = Dispatcher::new(
            deps.store.clone(),
            deps.storage.clone(),
            deps.audit.clone(),
            pool.clone(),
            list_timeout,
            config.next_action_webhook().map(str::to_string),
        );
        info!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            max_attempts = config.retry_policy.max_attempts,
            "Intake service ready"
        );
        Self {
            store: deps.store,
            storage: deps.storage,
            audit: deps.audit,
            dispatcher,
            pool,
            grammar,
        }
    }

    /// Creates a session and its storage folder.
    pub async fn open_session(&self, email: &str, goal: &str) -> IntakeResult<Session> {
        let email = email.trim();
        let goal = goal.trim();
        if email.is_empty() || goal.is_empty() {
            return Err(IntakeError::InvalidInput(
                "email and goal are required".into(),
            ));
        }

        let id = new_session_id(email);
        let folder = self.storage.create_folder(&id).await?;
        let session = self.store.create(id, email, goal, folder)?;
        info!(session_id = %session.id, "Session opened");
        self.audit_event(&session, events::SESSION_CREATED).await;
        Ok(session)
    }

    /// Refreshes and returns the session's classified files.
    ///
    /// A session is only visible to the email that opened it; a mismatch is
    /// reported as `NotFound`.
    pub async fn list_files(&self, session_id: &str, email: &str) -> IntakeResult<Session> {
        let session = self.store.get(session_id)?;
        if !session.email.eq_ignore_ascii_case(email.trim()) {
            return Err(IntakeError::NotFound(format!("session '{session_id}'")));
        }
        let session = self.dispatcher.refresh(&session).await?;
        self.audit_event(&session, events::FILES_LISTED).await;
        Ok(session)
    }

    /// Interprets a free-text message and dispatches when it is a trigger.
    pub async fn submit_message(
        &self,
        session_id: &str,
        message: &str,
    ) -> IntakeResult<TriggerOutcome> {
        // Unknown sessions fail even for non-trigger messages.
        self.store.get(session_id)?;
        let kind = self.grammar.parse(message);
        debug!(session_id = %session_id, ?kind, "Message parsed");
        match kind {
            CommandKind::UploadComplete | CommandKind::Retry => self.dispatch(session_id).await,
            CommandKind::Affirmation | CommandKind::Unrecognized => {
                Ok(TriggerOutcome::WaitingForMoreInput)
            }
        }
    }

    /// Observes an explicit trigger.
    pub async fn dispatch(&self, session_id: &str) -> IntakeResult<TriggerOutcome> {
        let outcome = self.dispatcher.dispatch(session_id).await?;
        info!(session_id = %session_id, outcome = %outcome, "Trigger observed");
        Ok(outcome)
    }

    /// Snapshot of one session.
    pub fn session(&self, session_id: &str) -> IntakeResult<Session> {
        self.store.get(session_id)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    /// Drops sessions idle longer than `ttl`.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let evicted = self.store.evict_idle(ttl);
        if evicted > 0 {
            info!(evicted, remaining = self.store.len(), "Idle sessions evicted");
        }
        evicted
    }

    /// Stops accepting deliveries and waits for queued ones to finish.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
        info!("Delivery pool drained");
    }

    async fn audit_event(&self, session: &Session, event: &str) {
        let entry = AuditEntry::new(
            session.id.as_str(),
            session.email.as_str(),
            session.goal.as_str(),
            session.folder.display_url(),
            event,
        );
        record_best_effort(self.audit.as_ref(), entry).await;
    }
}
