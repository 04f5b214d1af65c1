use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::{
    join_path, last_segment, parent_of, FileStore, Folder, StorageError, StoredFile,
};

/// Key/value store with the same prefix semantics as the S3 backend.
#[derive(Default)]
pub struct InMemoryFileStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    fail_moves: AtomicBool,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, content: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), content.into());
    }

    /// Every later `move_folder` call fails with a backend error.
    pub fn fail_moves(&self) {
        self.fail_moves.store(true, Ordering::SeqCst);
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn get_json(&self, key: &str) -> Option<serde_json::Value> {
        self.get(key)
            .and_then(|b| serde_json::from_slice(&b).ok())
    }

    pub fn keys_under(&self, prefix: &str) -> Vec<String> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn list_folders(&self, parent: &str) -> Result<Vec<Folder>, StorageError> {
        let prefix = format!("{}/", parent.trim_end_matches('/'));
        let mut folders: Vec<Folder> = Vec::new();
        for key in self.objects.lock().unwrap().keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                if let Some((child, _)) = rest.split_once('/') {
                    let id = join_path(parent, child);
                    if folders.last().map(|f| f.id != id).unwrap_or(true) {
                        folders.push(Folder {
                            id,
                            name: child.to_string(),
                        });
                    }
                }
            }
        }
        Ok(folders)
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<StoredFile>, StorageError> {
        let prefix = format!("{}/", folder_id.trim_end_matches('/'));
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| {
                k.strip_prefix(&prefix)
                    .map(|rest| !rest.contains('/'))
                    .unwrap_or(false)
            })
            .map(|k| StoredFile::from_key(k))
            .collect())
    }

    async fn download(&self, file_id: &str) -> Result<Bytes, StorageError> {
        self.get(file_id)
            .ok_or_else(|| StorageError::NotFound(file_id.to_string()))
    }

    async fn write_json(
        &self,
        folder_id: &str,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<StoredFile, StorageError> {
        let key = join_path(folder_id, name);
        let body = serde_json::to_vec(value)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        self.put(&key, body);
        Ok(StoredFile::from_key(&key))
    }

    async fn rename_file(&self, file_id: &str, new_name: &str) -> Result<StoredFile, StorageError> {
        let mut objects = self.objects.lock().unwrap();
        let content = objects
            .remove(file_id)
            .ok_or_else(|| StorageError::NotFound(file_id.to_string()))?;
        let target = join_path(parent_of(file_id), new_name);
        objects.insert(target.clone(), content);
        Ok(StoredFile::from_key(&target))
    }

    async fn move_folder(
        &self,
        folder_id: &str,
        dest_parent: &str,
    ) -> Result<Folder, StorageError> {
        if self.fail_moves.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(format!(
                "copy of '{folder_id}' was refused"
            )));
        }
        let name = last_segment(folder_id).to_string();
        let dest = join_path(dest_parent, &name);
        let prefix = format!("{}/", folder_id.trim_end_matches('/'));

        let mut objects = self.objects.lock().unwrap();
        let keys: Vec<String> = objects
            .keys()
            .filter(|k| k.starts_with(&prefix))
            .cloned()
            .collect();
        if keys.is_empty() {
            return Err(StorageError::NotFound(folder_id.to_string()));
        }
        for key in keys {
            if let Some(content) = objects.remove(&key) {
                let relative = &key[prefix.len()..];
                objects.insert(join_path(&dest, relative), content);
            }
        }
        Ok(Folder { id: dest, name })
    }

    fn folder_link(&self, folder_id: &str) -> String {
        format!("memory://{folder_id}/")
    }

    fn file_link(&self, file_id: &str) -> String {
        format!("memory://{file_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_folders_and_files() {
        let store = InMemoryFileStore::new();
        store.put("L1/IT Support/Priya Shah/resume.pdf", "r");
        store.put("L1/IT Support/Priya Shah/sub/x.txt", "x");
        store.put("L1/IT Support/Arun Rao/resume.pdf", "r");

        let folders = store.list_folders("L1/IT Support").await.unwrap();
        let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Arun Rao", "Priya Shah"]);

        let files = store.list_files("L1/IT Support/Priya Shah").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "resume.pdf");
    }

    #[tokio::test]
    async fn test_move_folder_relocates_everything() {
        let store = InMemoryFileStore::new();
        store.put("L1/IT Support/Priya Shah/resume.pdf", "r");
        store.put("L1/IT Support/Priya Shah/sub/x.txt", "x");

        let moved = store
            .move_folder("L1/IT Support/Priya Shah", "L2/IT Support")
            .await
            .unwrap();
        assert_eq!(moved.id, "L2/IT Support/Priya Shah");
        assert!(store.keys_under("L1/IT Support/Priya Shah").is_empty());
        assert_eq!(store.keys_under("L2/IT Support/Priya Shah").len(), 2);
    }

    #[tokio::test]
    async fn test_move_missing_folder_is_not_found() {
        let store = InMemoryFileStore::new();
        let err = store.move_folder("nope", "dest").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
