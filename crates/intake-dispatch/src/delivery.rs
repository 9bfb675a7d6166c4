use async_trait::async_trait;
use intake_core::{FileRecord, FolderRef, IntakeError, IntakeResult};
use intake_session::Session;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Body posted to the downstream processing webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPayload {
    /// Session being dispatched.
    pub session_id: String,
    /// Owner email.
    pub email: String,
    /// Assessment goal.
    pub goal: String,
    /// Classified files.
    pub files: Vec<FileRecord>,
    /// Upload folder.
    pub folder_ref: FolderRef,
    /// Follow-up webhook the downstream processor should call next.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action_webhook: Option<String>,
}

impl DispatchPayload {
    /// Builds the payload from a session snapshot.
    pub fn from_session(session: &Session, next_action_webhook: Option<&str>) -> Self {
        Self {
            session_id: session.id.clone(),
            email: session.email.clone(),
            goal: session.goal.clone(),
            files: session.files.clone(),
            folder_ref: session.folder.clone(),
            next_action_webhook: next_action_webhook.map(str::to_string),
        }
    }
}

/// Forwards a payload to the downstream processor.
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, payload: &DispatchPayload) -> IntakeResult<()>;
}

/// Delivers payloads with an HTTP POST.
pub struct WebhookDeliverer {
    client: reqwest::Client,
    url: String,
}

impl WebhookDeliverer {
    /// `timeout` bounds each individual request.
    pub fn new(url: impl Into<String>, timeout: Duration) -> IntakeResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(IntakeError::Config("downstream URL is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| IntakeError::Config(format!("delivery HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    /// Downstream endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Maps a transport error to the retry taxonomy.
fn classify_send_error(err: &reqwest::Error) -> IntakeError {
    if err.is_timeout() {
        IntakeError::Transient(format!("downstream request timed out: {err}"))
    } else if err.is_connect() {
        IntakeError::Transient(format!("downstream connection failed: {err}"))
    } else if err.is_builder() {
        IntakeError::Permanent(format!("invalid downstream request: {err}"))
    } else {
        IntakeError::Transient(format!("downstream request failed: {err}"))
    }
}

#[async_trait]
impl Deliver for WebhookDeliverer {
    async fn deliver(&self, payload: &DispatchPayload) -> IntakeResult<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = resp.status();
        debug!(session_id = %payload.session_id, status = %status, "Downstream responded");
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        let detail = format!("downstream returned {status}: {}", body.trim());
        if status.is_server_error() {
            Err(IntakeError::Transient(detail))
        } else {
            Err(IntakeError::Permanent(detail))
        }
    }
}
