//! File Storage
//!
//! Uploaded files live in exactly one backend per deployment:
//! - [`LocalDisk`] - a directory on the server's filesystem
//! - [`RemoteBucket`] - an S3-compatible bucket (AWS, MinIO, Supabase Storage)
//!
//! HTTP handlers only talk to [`FileGateway`], which derives the storage key
//! for new uploads and forwards everything else to the active backend.
//! Writes are last-write-wins; there is no locking between concurrent
//! requests touching the same key.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::{StorageConfig, StorageProvider};
use crate::naming::KeyDeriver;

pub mod local;
pub mod s3_client;

pub use local::LocalDisk;
pub use s3_client::RemoteBucket;

/// MIME type recorded when the client did not send one
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    BackendUnavailable(String),

    #[error("Operation not supported by the {0} backend")]
    Unsupported(&'static str),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A stored file read back from a backend
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub key: String,
    pub bytes: Bytes,
    pub content_type: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One entry of a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq)]
pub struct PutOutcome {
    pub key: String,
    pub url: Option<String>,
}

/// A concrete storage substrate.
///
/// Keys handed to backends have already been checked by [`validate_key`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short name used in logs and the health endpoint
    fn name(&self) -> &'static str;

    /// Store `bytes` under `key`, replacing whatever was there
    async fn write(&self, key: &str, bytes: Bytes, content_type: &str) -> StorageResult<()>;

    /// Publicly resolvable URL for `key`, if the backend has one
    fn public_url(&self, _key: &str) -> Option<String> {
        None
    }

    async fn list(&self) -> StorageResult<Vec<FileEntry>>;

    async fn get(&self, key: &str) -> StorageResult<StoredFile>;

    async fn delete(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Unsupported(self.name()))
    }

    fn supports_delete(&self) -> bool {
        false
    }
}

/// Reject keys that are not a single plain path segment
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key == "." || key == ".." || key.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidInput(format!("Invalid file name: {:?}", key)));
    }
    Ok(())
}

/// The single storage handle shared by all request handlers
#[derive(Clone)]
pub struct FileGateway {
    backend: Arc<dyn StorageBackend>,
    deriver: KeyDeriver,
}

impl FileGateway {
    pub fn new(backend: Arc<dyn StorageBackend>, deriver: KeyDeriver) -> Self {
        Self { backend, deriver }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn supports_delete(&self) -> bool {
        self.backend.supports_delete()
    }

    /// Derive the key for an upload and write it to the backend
    pub async fn put(
        &self,
        original_name: &str,
        bytes: Bytes,
        mime_type: Option<&str>,
        now: &impl Datelike,
    ) -> StorageResult<PutOutcome> {
        if bytes.is_empty() {
            return Err(StorageError::InvalidInput("No file uploaded".to_string()));
        }

        let key = self.deriver.derive(original_name, &bytes, now);
        validate_key(&key)?;

        let size = bytes.len();
        let content_type = mime_type.unwrap_or(DEFAULT_UPLOAD_CONTENT_TYPE);
        self.backend.write(&key, bytes, content_type).await?;

        info!(
            backend = self.backend.name(),
            original = %original_name,
            key = %key,
            size,
            "Stored upload"
        );

        Ok(PutOutcome {
            url: self.backend.public_url(&key),
            key,
        })
    }

    /// Every stored file, sorted by name
    pub async fn list(&self) -> StorageResult<Vec<FileEntry>> {
        let mut entries = self.backend.list().await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub async fn get(&self, key: &str) -> StorageResult<StoredFile> {
        validate_key(key)?;
        self.backend.get(key).await
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.backend.delete(key).await?;
        info!(backend = self.backend.name(), key = %key, "Deleted file");
        Ok(())
    }
}

/// Build the configured backend. Called once at startup.
pub async fn build_backend(config: &StorageConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    let backend: Arc<dyn StorageBackend> = match config.provider {
        StorageProvider::Local => Arc::new(LocalDisk::open(&config.upload_dir).await?),
        StorageProvider::S3 => Arc::new(RemoteBucket::from_config(config)?),
    };
    info!(backend = backend.name(), "Storage backend ready");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::{KeyStrategy, MonthLocale};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    async fn local_gateway(dir: &TempDir) -> FileGateway {
        let backend = LocalDisk::open(dir.path()).await.unwrap();
        FileGateway::new(Arc::new(backend), KeyDeriver::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("September_2024.pdf").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a\\b").is_err());
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let dir = TempDir::new().unwrap();
        let gateway = local_gateway(&dir).await;
        let payload = Bytes::from_static(b"%PDF-1.7\x00\xff binary");

        let outcome = gateway
            .put("report.pdf", payload.clone(), Some("application/pdf"), &date(2024, 9, 15))
            .await
            .unwrap();

        assert_eq!(outcome.key, "September_2024.pdf");
        assert_eq!(outcome.url, None);

        let stored = gateway.get(&outcome.key).await.unwrap();
        assert_eq!(stored.bytes, payload);
    }

    #[tokio::test]
    async fn test_later_upload_in_same_month_overwrites() {
        let dir = TempDir::new().unwrap();
        let gateway = local_gateway(&dir).await;

        gateway
            .put("report.pdf", Bytes::from_static(b"first"), None, &date(2024, 9, 15))
            .await
            .unwrap();
        let second = gateway
            .put("invoice.pdf", Bytes::from_static(b"second"), None, &date(2024, 9, 20))
            .await
            .unwrap();

        let stored = gateway.get(&second.key).await.unwrap();
        assert_eq!(stored.bytes.as_ref(), b"second");

        let names: Vec<String> = gateway.list().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["September_2024.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let dir = TempDir::new().unwrap();
        let gateway = local_gateway(&dir).await;

        let err = gateway
            .put("report.pdf", Bytes::new(), None, &date(2024, 9, 15))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
        assert!(gateway.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let dir = TempDir::new().unwrap();
        let gateway = local_gateway(&dir).await;

        let outcome = gateway
            .put("notes.txt", Bytes::from_static(b"hello"), Some("text/plain"), &date(2024, 1, 5))
            .await
            .unwrap();
        gateway.delete(&outcome.key).await.unwrap();

        let err = gateway.get(&outcome.key).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_digest_strategy_keeps_both_uploads() {
        let dir = TempDir::new().unwrap();
        let backend = LocalDisk::open(dir.path()).await.unwrap();
        let gateway = FileGateway::new(
            Arc::new(backend),
            KeyDeriver::new(MonthLocale::Indonesian, KeyStrategy::Digest),
        );
        let now = date(2024, 9, 15);

        let a = gateway.put("a.pdf", Bytes::from_static(b"one"), None, &now).await.unwrap();
        let b = gateway.put("b.pdf", Bytes::from_static(b"two"), None, &now).await.unwrap();

        assert_ne!(a.key, b.key);
        assert_eq!(gateway.list().await.unwrap().len(), 2);
    }
}
