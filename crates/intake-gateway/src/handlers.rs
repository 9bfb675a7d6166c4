use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use intake_core::{FileRecord, IntakeError};
use intake_session::Session;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Body of `POST /start_analysis`.
#[derive(Debug, Deserialize)]
pub struct StartAnalysisRequest {
    /// Client email.
    #[serde(default)]
    pub email: Option<String>,
    /// Assessment goal.
    #[serde(default)]
    pub goal: Option<String>,
}

/// Reply to `POST /start_analysis`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StartAnalysisResponse {
    /// Id of the new session.
    pub session_id: String,
    /// Where the client uploads files.
    pub folder_url: String,
}

/// Body of `POST /list_files`.
#[derive(Debug, Deserialize)]
pub struct ListFilesRequest {
    /// Session to list.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Must match the session owner.
    #[serde(default)]
    pub email: Option<String>,
}

/// Reply to `POST /list_files`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListFilesResponse {
    /// Listed session.
    pub session_id: String,
    /// Owner email.
    pub email: String,
    /// Classified files.
    pub files: Vec<FileRecord>,
}

/// Body of `POST /user_message`.
#[derive(Debug, Deserialize)]
pub struct UserMessageRequest {
    /// Target session.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Free-text message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply to `POST /user_message`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserMessageResponse {
    /// Trigger outcome status.
    pub status: String,
}

/// Unwraps a body field, treating absent and blank values alike.
fn required(field: &'static str, value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError(IntakeError::InvalidInput(format!("'{field}' is required"))))
}

/// `GET /`
pub async fn root_handler() -> &'static str {
    "Intake server is live"
}

/// `GET /health`
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "intake",
        "sessions": state.service.session_count(),
    }))
}

/// `POST /start_analysis`
pub async fn start_analysis_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<StartAnalysisRequest>, JsonRejection>,
) -> ApiResult<StartAnalysisResponse> {
    let Json(req) = body?;
    let email = required("email", req.email)?;
    let goal = required("goal", req.goal)?;

    let session = state.service.open_session(&email, &goal).await?;
    Ok(Json(StartAnalysisResponse {
        folder_url: session.folder.display_url().to_string(),
        session_id: session.id,
    }))
}

/// `POST /list_files`
pub async fn list_files_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ListFilesRequest>, JsonRejection>,
) -> ApiResult<ListFilesResponse> {
    let Json(req) = body?;
    let session_id = required("session_id", req.session_id)?;
    let email = required("email", req.email)?;

    let session = state.service.list_files(&session_id, &email).await?;
    Ok(Json(ListFilesResponse {
        session_id: session.id,
        email: session.email,
        files: session.files,
    }))
}

/// `POST /user_message`
pub async fn user_message_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<UserMessageRequest>, JsonRejection>,
) -> ApiResult<UserMessageResponse> {
    let Json(req) = body?;
    let session_id = required("session_id", req.session_id)?;
    let message = req.message.ok_or_else(|| {
        ApiError(IntakeError::InvalidInput("'message' is required".into()))
    })?;

    let outcome = state.service.submit_message(&session_id, &message).await?;
    Ok(Json(UserMessageResponse {
        status: outcome.as_status().to_string(),
    }))
}

/// `GET /sessions/{id}`
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Session> {
    Ok(Json(state.service.session(&id)?))
}
