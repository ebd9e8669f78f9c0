use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use async_trait::async_trait;
use futures::StreamExt;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use uuid::Uuid;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    /// Create the storage root if needed.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a storage key to a path below the root.
    ///
    /// Only plain relative components are accepted, so the result can never
    /// escape `base_path`. `..` inside a file name (`a..b.mp4`) is a normal
    /// component and allowed.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.is_empty() || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let relative = Path::new(storage_key);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(self.base_path.join(relative))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.part", Uuid::new_v4().simple()));
    path.with_file_name(name)
}

async fn remove_partial(temp_path: &Path) {
    if let Err(e) = fs::remove_file(temp_path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(
                path = %temp_path.display(),
                error = %e,
                "Failed to remove partial upload"
            );
        }
    }
}

fn not_found_or(
    storage_key: &str,
    err: std::io::Error,
    wrap: fn(String) -> StorageError,
) -> StorageError {
    if err.kind() == ErrorKind::NotFound {
        StorageError::NotFound(storage_key.to_string())
    } else {
        wrap(err.to_string())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_stream(
        &self,
        storage_key: &str,
        _content_type: &str,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        self.ensure_parent_dir(&path).await?;

        // Readers never observe a partially written object
        let temp_path = partial_path(&path);
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        let written = async {
            let n = tokio::io::copy(&mut reader, &mut file).await?;
            file.sync_all().await?;
            Ok::<u64, std::io::Error>(n)
        }
        .await;
        drop(file);

        let bytes_copied = match written {
            Ok(n) => n,
            Err(e) => {
                remove_partial(&temp_path).await;
                return Err(StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        if let Err(e) = fs::rename(&temp_path, &path).await {
            remove_partial(&temp_path).await;
            return Err(StorageError::UploadFailed(format!(
                "Failed to move upload into place at {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            key = %storage_key,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(bytes_copied)
    }

    async fn content_length(&self, storage_key: &str) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| not_found_or(storage_key, e, StorageError::DownloadFailed))?;
        if !meta.is_file() {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        Ok(meta.len())
    }

    async fn download_range_stream(
        &self,
        storage_key: &str,
        offset: u64,
        length: Option<u64>,
    ) -> StorageResult<ByteStream> {
        let path = self.key_to_path(storage_key)?;

        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or(storage_key, e, StorageError::DownloadFailed))?;

        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await.map_err(|e| {
                StorageError::DownloadFailed(format!("Failed to seek to {}: {}", offset, e))
            })?;
        }

        let reader: Pin<Box<dyn AsyncRead + Send>> = match length {
            Some(n) => Box::pin(file.take(n)),
            None => Box::pin(file),
        };

        let key = storage_key.to_string();
        let stream = ReaderStream::with_capacity(reader, READ_CHUNK_SIZE).map(move |item| {
            item.map_err(|e| {
                tracing::error!(key = %key, error = %e, "Local storage stream read error");
                StorageError::DownloadFailed(format!("Failed to read chunk: {}", e))
            })
        });

        tracing::debug!(
            key = %storage_key,
            offset = offset,
            length = ?length,
            "Local storage range stream opened"
        );

        Ok(Box::pin(stream))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key = %storage_key, "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
