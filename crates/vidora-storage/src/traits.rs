//! Storage abstraction trait
//!
//! Backends implement [`Storage`]; the rest of the workspace only ever holds an
//! `Arc<dyn Storage>`.

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;
use vidora_core::AppError;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked body of a stored object.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::FileMissing(key),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Blob storage backend.
///
/// Objects are immutable once written; readers may stream concurrently
/// without coordination.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write everything `reader` yields under `storage_key` and return the
    /// number of bytes written.
    async fn upload_stream(
        &self,
        storage_key: &str,
        content_type: &str,
        reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64>;

    /// Total size in bytes. Returns `StorageError::NotFound` if the object is absent.
    async fn content_length(&self, storage_key: &str) -> StorageResult<u64>;

    /// Stream the object starting at byte `offset`.
    ///
    /// With `length = Some(n)` at most `n` bytes are yielded; otherwise the
    /// stream runs to the end of the object.
    async fn download_range_stream(
        &self,
        storage_key: &str,
        offset: u64,
        length: Option<u64>,
    ) -> StorageResult<ByteStream>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
