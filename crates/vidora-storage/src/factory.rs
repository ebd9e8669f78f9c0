use crate::{LocalStorage, Storage, StorageResult};
use std::sync::Arc;
use vidora_core::Config;

/// Create the blob storage backend described by `config`.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(config.storage_path()).await?;
    tracing::info!(
        backend = storage.backend_name(),
        path = %storage.base_path().display(),
        "Blob storage ready"
    );
    Ok(Arc::new(storage))
}
