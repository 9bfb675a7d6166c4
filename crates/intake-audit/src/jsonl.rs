use crate::entry::AuditEntry;
use crate::sink::AuditSink;
use async_trait::async_trait;
use intake_core::{IntakeError, IntakeResult};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::error;

/// Audit trail persisted as one JSON object per line.
///
/// Appends are handed to a background writer task so callers never wait on
/// disk I/O. Entries are written in the order they were appended.
pub struct JsonlAuditSink {
    tx: mpsc::UnboundedSender<AuditEntry>,
    path: PathBuf,
}

impl JsonlAuditSink {
    /// Spawns the writer task. Must be called inside a Tokio runtime.
    pub fn new(log_dir: PathBuf) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEntry>();
        let path = log_dir.join("audit.jsonl");
        let log_file = path.clone();

        tokio::spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&log_dir).await {
                error!(dir = %log_dir.display(), error = %e, "Cannot create audit directory");
            }
            let mut file = match tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)
                .await
            {
                Ok(f) => f,
                Err(e) => {
                    error!(file = %log_file.display(), error = %e, "Cannot open audit log");
                    return;
                }
            };

            while let Some(entry) = rx.recv().await {
                let Ok(mut line) = serde_json::to_string(&entry) else {
                    continue;
                };
                line.push('\n');
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    error!(error = %e, "Audit write failed");
                    continue;
                }
                let _ = file.flush().await;
            }
        });

        Self { tx, path }
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, entry: AuditEntry) -> IntakeResult<()> {
        self.tx
            .send(entry)
            .map_err(|_| IntakeError::Transient("audit writer has stopped".into()))
    }
}

/// Reads every entry from a JSONL audit file.
pub async fn read_entries(path: &Path) -> IntakeResult<Vec<AuditEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = tokio::fs::read_to_string(path).await?;
    let entries = data
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(serde_json::from_str)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}
