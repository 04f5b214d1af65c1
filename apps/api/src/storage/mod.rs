//! File store abstraction over the candidate folders.
//!
//! Folders are addressed by path-like ids (`L1 Pending Review/IT Support/Priya Shah`),
//! files by their full key. `S3FileStore` backs production; tests use the in-memory store.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;

#[cfg(test)]
pub mod memory;
pub mod s3;
pub mod text;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Unreadable document '{name}': {reason}")]
    Document { name: String, reason: String },
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(id) => AppError::NotFound(id),
            other => AppError::Storage(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

impl StoredFile {
    pub fn from_key(key: &str) -> Self {
        let name = last_segment(key).to_string();
        Self {
            id: key.to_string(),
            mime_type: mime_from_name(&name),
            name,
        }
    }

    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Immediate child folders of `parent`.
    async fn list_folders(&self, parent: &str) -> Result<Vec<Folder>, StorageError>;

    /// Files directly inside `folder_id` (not recursive).
    async fn list_files(&self, folder_id: &str) -> Result<Vec<StoredFile>, StorageError>;

    async fn download(&self, file_id: &str) -> Result<Bytes, StorageError>;

    /// Creates or overwrites `name` inside `folder_id`.
    async fn write_json(
        &self,
        folder_id: &str,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<StoredFile, StorageError>;

    /// Renames a file in place, keeping its folder.
    async fn rename_file(&self, file_id: &str, new_name: &str) -> Result<StoredFile, StorageError>;

    /// Moves a folder with all its contents under `dest_parent`.
    async fn move_folder(&self, folder_id: &str, dest_parent: &str)
        -> Result<Folder, StorageError>;

    fn folder_link(&self, folder_id: &str) -> String;

    fn file_link(&self, file_id: &str) -> String;
}

/// Looks up a file by exact name in a folder listing.
pub fn find_named<'a>(files: &'a [StoredFile], name: &str) -> Option<&'a StoredFile> {
    files.iter().find(|f| f.name == name)
}

/// Downloads and parses a JSON file, treating unreadable content as absent.
pub async fn read_json(
    store: &dyn FileStore,
    file: &StoredFile,
) -> Result<Option<serde_json::Value>, StorageError> {
    let bytes = store.download(&file.id).await?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!("Ignoring malformed JSON in {}: {e}", file.id);
            Ok(None)
        }
    }
}

pub fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

pub fn parent_of(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit_once('/')
        .map(|(parent, _)| parent)
        .unwrap_or("")
}

pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

pub fn extension_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

pub fn mime_from_name(name: &str) -> String {
    mime_guess::from_path(name).first_or_octet_stream().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_helpers() {
        let path = "L1 Pending Review/IT Support/Priya Shah";
        assert_eq!(last_segment(path), "Priya Shah");
        assert_eq!(parent_of(path), "L1 Pending Review/IT Support");
        assert_eq!(join_path("Profiles/", "x.json"), "Profiles/x.json");
        assert_eq!(parent_of("top"), "");
    }

    #[test]
    fn test_stored_file_from_key() {
        let file = StoredFile::from_key("a/b/Resume.PDF");
        assert_eq!(file.name, "Resume.PDF");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(file.extension(), "pdf");
    }

    #[test]
    fn test_mime_from_name() {
        assert_eq!(mime_from_name("Resume.pdf"), "application/pdf");
        assert_eq!(
            mime_from_name("JD_IT_Support.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(mime_from_name("L1 Transcript.txt"), "text/plain");
        assert_eq!(mime_from_name("interview.mp4"), "video/mp4");
        assert_eq!(mime_from_name("notes"), "application/octet-stream");
    }
}
