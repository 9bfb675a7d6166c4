use crate::gateway::{with_timeout, StorageGateway};
use async_trait::async_trait;
use intake_core::{FolderRef, IntakeError, IntakeResult, RemoteFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the local folder provider.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one sub-folder per session.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Display URL for a folder; `{id}` is replaced by the folder id.
    #[serde(default = "default_folder_url_template")]
    pub folder_url_template: String,
    /// Public base URL for files. `file://` paths are used when unset.
    #[serde(default)]
    pub file_url_base: Option<String>,
    /// Bound on a single listing call.
    #[serde(default = "default_list_timeout_secs")]
    pub list_timeout_secs: u64,
}

fn default_root() -> PathBuf {
    PathBuf::from("/tmp/temp_sessions")
}

fn default_folder_url_template() -> String {
    "https://drive.google.com/folderview?id={id}".to_string()
}

fn default_list_timeout_secs() -> u64 {
    10
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            folder_url_template: default_folder_url_template(),
            file_url_base: None,
            list_timeout_secs: default_list_timeout_secs(),
        }
    }
}

impl StorageConfig {
    /// Timeout applied to each listing.
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

/// Storage provider backed by a local directory tree.
pub struct LocalFolderGateway {
    config: StorageConfig,
}

impl LocalFolderGateway {
    /// Creates the provider, making sure the root directory exists.
    pub async fn new(config: StorageConfig) -> IntakeResult<Self> {
        tokio::fs::create_dir_all(&config.root).await?;
        Ok(Self { config })
    }

    /// Directory holding one folder per session.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn folder_path(&self, id: &str) -> IntakeResult<PathBuf> {
        validate_folder_name(id)?;
        Ok(self.config.root.join(id))
    }

    fn file_url(&self, folder_id: &str, name: &str, path: &Path) -> String {
        match &self.config.file_url_base {
            Some(base) => format!("{}/{folder_id}/{name}", base.trim_end_matches('/')),
            None => format!("file://{}", path.display()),
        }
    }

    async fn read_folder(&self, folder: &FolderRef) -> IntakeResult<Vec<RemoteFile>> {
        let dir = self.folder_path(&folder.id)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IntakeError::NotFound(format!("folder '{}'", folder.id)));
            }
            Err(e) => return Err(IntakeError::Transient(format!("listing failed: {e}"))),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let url = self.file_url(&folder.id, &name, &entry.path());
            files.push(RemoteFile { name, url });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

/// Folder names become path components, so separators and `..` are rejected.
fn validate_folder_name(name: &str) -> IntakeResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0')
    {
        return Err(IntakeError::InvalidInput(format!(
            "invalid folder name '{name}'"
        )));
    }
    Ok(())
}

#[async_trait]
impl StorageGateway for LocalFolderGateway {
    async fn create_folder(&self, name: &str) -> IntakeResult<FolderRef> {
        let path = self.folder_path(name)?;
        tokio::fs::create_dir_all(&path).await?;
        let url = self.config.folder_url_template.replace("{id}", name);
        info!(folder = %path.display(), "Created session folder");
        Ok(FolderRef::new(name, Some(url)))
    }

    async fn list_files(
        &self,
        folder: &FolderRef,
        timeout: Duration,
    ) -> IntakeResult<Vec<RemoteFile>> {
        let files = with_timeout("folder listing", timeout, self.read_folder(folder)).await?;
        debug!(folder = %folder.id, count = files.len(), "Listed folder");
        Ok(files)
    }
}
