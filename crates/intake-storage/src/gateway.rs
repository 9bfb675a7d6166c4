use async_trait::async_trait;
use intake_core::{FolderRef, IntakeError, IntakeResult, RemoteFile};
use std::future::Future;
use std::time::Duration;

/// Remote directory service holding the files a client uploads for a session.
///
/// Listings are eventually consistent: a listing may omit files that were
/// uploaded recently. That is not an error.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Creates a folder and returns a handle to it.
    async fn create_folder(&self, name: &str) -> IntakeResult<FolderRef>;

    /// Lists files in `folder`. Expiry of `timeout` is a `Transient` error and
    /// an unknown folder is `NotFound`.
    async fn list_files(
        &self,
        folder: &FolderRef,
        timeout: Duration,
    ) -> IntakeResult<Vec<RemoteFile>>;
}

/// Runs `fut` under `timeout`, mapping expiry to [`IntakeError::Transient`].
pub async fn with_timeout<T, F>(what: &str, timeout: Duration, fut: F) -> IntakeResult<T>
where
    F: Future<Output = IntakeResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(IntakeError::Transient(format!(
            "{what} timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}
