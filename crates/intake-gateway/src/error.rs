use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use intake_core::IntakeError;
use tracing::{error, warn};

/// An [`IntakeError`] rendered as `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub IntakeError);

impl ApiError {
    /// HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            IntakeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            IntakeError::NotFound(_) => StatusCode::NOT_FOUND,
            IntakeError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            IntakeError::Permanent(_) => StatusCode::BAD_GATEWAY,
            IntakeError::Config(_) | IntakeError::Json(_) | IntakeError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(IntakeError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = %status, error = %self.0, "Request failed");
        } else {
            warn!(status = %status, error = %self.0, "Request rejected");
        }
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}
