use crate::classifier::{classify, FileCategory};
use serde::{Deserialize, Serialize};

/// Opaque handle to a session's folder in the storage provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRef {
    /// Provider-specific folder identifier.
    pub id: String,
    /// Display URL handed back to the client, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FolderRef {
    /// Creates a folder reference.
    pub fn new(id: impl Into<String>, url: Option<String>) -> Self {
        Self {
            id: id.into(),
            url,
        }
    }

    /// The display URL, or an empty string if the provider gave none.
    pub fn display_url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }
}

/// A file as reported by the storage provider, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// File name as shown by the provider.
    pub name: String,
    /// Link to the file.
    pub url: String,
}

/// A listed file tagged with its category.
///
/// Serializes with the field names the downstream webhook expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File name as listed.
    #[serde(rename = "file_name")]
    pub name: String,
    /// Link to the file.
    #[serde(rename = "file_url")]
    pub url: String,
    /// Category from the classifier.
    #[serde(rename = "type")]
    pub category: FileCategory,
}

impl FileRecord {
    /// Builds a record, classifying the name.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        let category = classify(&name);
        Self {
            name,
            url: url.into(),
            category,
        }
    }
}

impl From<RemoteFile> for FileRecord {
    fn from(file: RemoteFile) -> Self {
        FileRecord::new(file.name, file.url)
    }
}
