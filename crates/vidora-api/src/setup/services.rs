//! Wiring of repositories, storage and the progress tracker into [`AppState`].

use crate::services::events::EventBus;
use crate::services::streamer::RangeStreamer;
use crate::state::{AppState, DbState, MediaConfig, ProcessingState};
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use vidora_core::Config;
use vidora_db::create_stores;
use vidora_processing::{ClassificationPolicy, ProgressTracker, RandomClassifier};
use vidora_storage::Storage;

pub fn initialize_services(
    config: &Config,
    pool: Option<PgPool>,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let stores = create_stores(config, pool)?;
    Ok(build_state(
        config.clone(),
        DbState::from(stores),
        storage,
        Arc::new(RandomClassifier),
    ))
}

/// Assemble state from already-built parts; tests use this to inject a
/// deterministic classifier and in-memory stores.
pub fn build_state(
    config: Config,
    db: DbState,
    storage: Arc<dyn Storage>,
    classifier: Arc<dyn ClassificationPolicy>,
) -> Arc<AppState> {
    let tracker = ProgressTracker::new(db.media.clone(), classifier, config.processing_tick());
    let events = EventBus::new(config.event_channel_capacity());
    let streamer = RangeStreamer::new(db.media.clone(), storage.clone());

    tracing::info!(
        tick_ms = config.processing_tick().as_millis() as u64,
        event_capacity = config.event_channel_capacity(),
        "Progress tracker ready"
    );

    Arc::new(AppState {
        db,
        media: MediaConfig {
            storage,
            streamer,
            max_video_size_bytes: config.max_video_size_bytes(),
        },
        processing: ProcessingState { tracker, events },
        config,
    })
}
