use crate::delivery::{Deliver, DispatchPayload};
use intake_audit::{events, record_best_effort, AuditEntry, AuditSink};
use intake_core::{IntakeError, IntakeResult};
use intake_session::{SessionState, SessionStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Collaborators a delivery worker needs to settle a session.
#[derive(Clone)]
pub struct DeliveryContext {
    /// Session table the outcome is written to.
    pub store: Arc<dyn SessionStore>,
    /// Deliverer, usually wrapped with retry.
    pub deliverer: Arc<dyn Deliver>,
    /// Trail for delivery outcomes.
    pub audit: Arc<dyn AuditSink>,
    /// Bound on the whole retry loop for one payload.
    pub deadline: Duration,
}

/// Bounded queue of in-flight payloads drained by a fixed set of workers.
///
/// Every queued payload belongs to a session in `DispatchInFlight`; the worker
/// that pops it is the only party allowed to move that session out.
pub struct DeliveryPool {
    tx: Mutex<Option<mpsc::Sender<DispatchPayload>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DeliveryPool {
    /// Spawns `workers` tasks sharing a queue of `capacity` payloads.
    /// Must be called inside a Tokio runtime.
    pub fn start(workers: usize, capacity: usize, ctx: DeliveryContext) -> Self {
        let (tx, rx) = mpsc::channel::<DispatchPayload>(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|worker| {
                let rx = rx.clone();
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    loop {
                        // Lock only for the pop so other workers can deliver concurrently.
                        let next = rx.lock().await.recv().await;
                        let Some(payload) = next else { break };
                        run_delivery(&ctx, worker, payload).await;
                    }
                    info!(worker, "Delivery worker stopped");
                })
            })
            .collect();

        Self {
            tx: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
        }
    }

    /// Queues a payload without waiting. A full or closed queue is `Transient`.
    pub fn submit(&self, payload: DispatchPayload) -> IntakeResult<()> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return Err(IntakeError::Transient("delivery pool is shut down".into()));
        };
        tx.try_send(payload).map_err(|e| match e {
            TrySendError::Full(p) => {
                IntakeError::Transient(format!("delivery queue full, session {}", p.session_id))
            }
            TrySendError::Closed(_) => IntakeError::Transient("delivery pool is shut down".into()),
        })
    }

    /// Closes the queue and waits for the workers to drain it.
    pub async fn shutdown(&self) {
        drop(self.tx.lock().take());
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Delivery worker panicked");
            }
        }
    }
}

async fn run_delivery(ctx: &DeliveryContext, worker: usize, payload: DispatchPayload) {
    info!(
        session_id = %payload.session_id,
        worker,
        files = payload.files.len(),
        "Delivering payload"
    );
    let result = match tokio::time::timeout(ctx.deadline, ctx.deliverer.deliver(&payload)).await
    {
        Ok(result) => result,
        Err(_) => Err(IntakeError::Transient(format!(
            "delivery deadline of {}s exceeded",
            ctx.deadline.as_secs()
        ))),
    };
    settle(
        ctx.store.as_ref(),
        ctx.audit.as_ref(),
        &payload,
        result.as_ref().map(|_| ()),
    )
    .await;
}

/// Moves an in-flight session to its outcome state and audits it.
pub(crate) async fn settle(
    store: &dyn SessionStore,
    audit: &dyn AuditSink,
    payload: &DispatchPayload,
    result: Result<(), &IntakeError>,
) {
    let id = payload.session_id.as_str();
    let event = match result {
        Ok(()) => {
            if !store.try_transition(id, SessionState::DispatchInFlight, SessionState::Dispatched)
            {
                warn!(session_id = %id, "Delivered session was no longer in flight");
            }
            info!(session_id = %id, "Assessment triggered");
            events::ASSESSMENT_TRIGGERED
        }
        Err(e) => {
            if !store.try_transition(
                id,
                SessionState::DispatchInFlight,
                SessionState::DispatchFailed,
            ) {
                warn!(session_id = %id, "Failed session was no longer in flight");
            }
            if let Err(record_err) = store.record_failure(id, &e.to_string()) {
                warn!(session_id = %id, error = %record_err, "Could not record delivery failure");
            }
            error!(session_id = %id, error = %e, "Assessment trigger failed");
            events::ASSESSMENT_TRIGGER_FAILED
        }
    };

    let entry = AuditEntry::new(
        id,
        payload.email.as_str(),
        payload.goal.as_str(),
        payload.folder_ref.display_url(),
        event,
    );
    record_best_effort(audit, entry).await;
}
