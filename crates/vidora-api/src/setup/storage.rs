//! Blob storage setup

use anyhow::{Context, Result};
use std::sync::Arc;
use vidora_core::Config;
use vidora_storage::{create_storage, Storage};

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    let storage = create_storage(config)
        .await
        .with_context(|| format!("Failed to initialize storage at {}", config.storage_path()))?;

    tracing::info!(
        backend = storage.backend_name(),
        max_video_mb = config.max_video_size_bytes() / 1024 / 1024,
        "Storage initialized"
    );
    Ok(storage)
}
