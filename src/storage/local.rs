// Local disk backend
// Files are kept flat in a single directory, named by their storage key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::{debug, info};

use super::{FileEntry, StorageBackend, StorageError, StorageResult, StoredFile};

pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    /// Use `root` as the upload directory, creating it if missing
    pub async fn open(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !fs::try_exists(&root).await? {
            fs::create_dir_all(&root).await?;
            info!(path = %root.display(), "Created upload directory");
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Fails with `NotFound` unless `path` is an existing regular file
    async fn ensure_exists(&self, key: &str, path: &Path) -> StorageResult<fs::File> {
        match fs::File::open(path).await {
            Ok(file) => {
                let meta = file.metadata().await.map_err(backend_error)?;
                if meta.is_file() {
                    Ok(file)
                } else {
                    Err(StorageError::NotFound(key.to_string()))
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(backend_error(e)),
        }
    }
}

fn backend_error(err: std::io::Error) -> StorageError {
    StorageError::BackendUnavailable(err.to_string())
}

#[async_trait]
impl StorageBackend for LocalDisk {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn write(&self, key: &str, bytes: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        debug!(path = %path.display(), size = bytes.len(), "Writing file");
        fs::write(&path, &bytes).await.map_err(backend_error)
    }

    async fn list(&self) -> StorageResult<Vec<FileEntry>> {
        let mut dir = fs::read_dir(&self.root).await.map_err(backend_error)?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await.map_err(backend_error)? {
            let meta = entry.metadata().await.map_err(backend_error)?;
            if !meta.is_file() {
                continue;
            }
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                url: None,
                size: Some(meta.len()),
                updated_at: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        Ok(entries)
    }

    async fn get(&self, key: &str) -> StorageResult<StoredFile> {
        let path = self.path_for(key);
        let file = self.ensure_exists(key, &path).await?;
        let updated_at = file
            .metadata()
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);
        drop(file);

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            // removed between the existence check and the read
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(backend_error(e)),
        };

        Ok(StoredFile {
            key: key.to_string(),
            bytes: Bytes::from(bytes),
            content_type: None,
            updated_at,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        self.ensure_exists(key, &path).await?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(backend_error(e)),
        }
    }

    fn supports_delete(&self) -> bool {
        true
    }
}
