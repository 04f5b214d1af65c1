use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{debug, info};

use crate::storage::{
    join_path, last_segment, parent_of, FileStore, Folder, StorageError, StoredFile,
};

/// `FileStore` over an S3-compatible bucket. Folders are key prefixes; moves and
/// renames are copy-then-delete since S3 has no native rename.
#[derive(Clone)]
pub struct S3FileStore {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

struct Listing {
    prefixes: Vec<String>,
    keys: Vec<String>,
}

impl S3FileStore {
    pub fn new(client: S3Client, bucket: String, endpoint: &str) -> Self {
        let public_base_url = format!("{}/{}", endpoint.trim_end_matches('/'), bucket);
        Self {
            client,
            bucket,
            public_base_url,
        }
    }

    /// Lists everything under `prefix/`. With `delimited`, only direct children.
    async fn list(&self, prefix: &str, delimited: bool) -> Result<Listing, StorageError> {
        let prefix = format!("{}/", prefix.trim_end_matches('/'));
        let mut listing = Listing {
            prefixes: Vec::new(),
            keys: Vec::new(),
        };
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .set_continuation_token(continuation.take());
            if delimited {
                request = request.delimiter("/");
            }
            let output = request
                .send()
                .await
                .map_err(|e| StorageError::Backend(format!("list {prefix}: {}", DisplayErrorContext(&e))))?;

            for common in output.common_prefixes() {
                if let Some(p) = common.prefix() {
                    listing.prefixes.push(p.trim_end_matches('/').to_string());
                }
            }
            for object in output.contents() {
                if let Some(key) = object.key() {
                    // Zero-byte folder markers
                    if !key.ends_with('/') {
                        listing.keys.push(key.to_string());
                    }
                }
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(listing)
    }

    async fn copy_then_delete(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let source = format!("{}/{}", self.bucket, encode_key(from));
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(source)
            .key(to)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("copy {from} -> {to}: {}", DisplayErrorContext(&e))))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(from)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("delete {from}: {}", DisplayErrorContext(&e))))?;

        debug!("Moved s3://{}/{} -> {}", self.bucket, from, to);
        Ok(())
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn list_folders(&self, parent: &str) -> Result<Vec<Folder>, StorageError> {
        let listing = self.list(parent, true).await?;
        Ok(listing
            .prefixes
            .into_iter()
            .map(|id| Folder {
                name: last_segment(&id).to_string(),
                id,
            })
            .collect())
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<StoredFile>, StorageError> {
        let listing = self.list(folder_id, true).await?;
        Ok(listing.keys.iter().map(|k| StoredFile::from_key(k)).collect())
    }

    async fn download(&self, file_id: &str) -> Result<Bytes, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(file_id)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    StorageError::NotFound(file_id.to_string())
                } else {
                    StorageError::Backend(format!("get {file_id}: {}", DisplayErrorContext(&e)))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("read {file_id}: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn write_json(
        &self,
        folder_id: &str,
        name: &str,
        value: &serde_json::Value,
    ) -> Result<StoredFile, StorageError> {
        let key = join_path(folder_id, name);
        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| StorageError::Backend(format!("serialize {key}: {e}")))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("put {key}: {}", DisplayErrorContext(&e))))?;

        debug!("Wrote s3://{}/{}", self.bucket, key);
        Ok(StoredFile::from_key(&key))
    }

    async fn rename_file(&self, file_id: &str, new_name: &str) -> Result<StoredFile, StorageError> {
        let target = join_path(parent_of(file_id), new_name);
        if target != file_id {
            self.copy_then_delete(file_id, &target).await?;
        }
        Ok(StoredFile::from_key(&target))
    }

    async fn move_folder(
        &self,
        folder_id: &str,
        dest_parent: &str,
    ) -> Result<Folder, StorageError> {
        let name = last_segment(folder_id).to_string();
        let dest = join_path(dest_parent, &name);
        let source_prefix = format!("{}/", folder_id.trim_end_matches('/'));

        let listing = self.list(folder_id, false).await?;
        if listing.keys.is_empty() {
            return Err(StorageError::NotFound(folder_id.to_string()));
        }
        for key in &listing.keys {
            let relative = key.strip_prefix(&source_prefix).unwrap_or(key);
            self.copy_then_delete(key, &join_path(&dest, relative)).await?;
        }

        info!("Moved folder '{}' to '{}'", folder_id, dest);
        Ok(Folder { id: dest, name })
    }

    fn folder_link(&self, folder_id: &str) -> String {
        format!("{}/{}/", self.public_base_url, encode_key(folder_id))
    }

    fn file_link(&self, file_id: &str) -> String {
        format!("{}/{}", self.public_base_url, encode_key(file_id))
    }
}

/// Percent-encodes a key for `x-amz-copy-source` and links, keeping `/` separators.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
