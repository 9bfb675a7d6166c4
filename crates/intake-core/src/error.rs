/// Top-level error type for the intake engine.
///
/// The first four variants form the taxonomy callers act on: `InvalidInput` and
/// `NotFound` are user-facing, `Transient` is retried internally, `Permanent` is
/// surfaced immediately.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Missing or malformed caller input (e.g. empty email or goal).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown session or storage folder.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A timeout, connection failure or 5xx from storage or the downstream webhook.
    #[error("Transient error: {0}")]
    Transient(String),

    /// A downstream 4xx or otherwise non-retryable failure.
    #[error("Permanent error: {0}")]
    Permanent(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntakeError {
    /// Whether a retry of the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, IntakeError::Transient(_))
    }
}

/// A convenience `Result` alias using [`IntakeError`].
pub type IntakeResult<T> = Result<T, IntakeError>;
