//! Application state and sub-state extractors.
//!
//! Handlers extract only the sub-state they need via Axum's `FromRef`.

use crate::services::events::EventBus;
use crate::services::streamer::RangeStreamer;
use std::sync::Arc;
use vidora_core::Config;
use vidora_db::{MediaStore, Stores, UserStore};
use vidora_processing::ProgressTracker;
use vidora_storage::Storage;

/// Metadata repositories.
#[derive(Clone)]
pub struct DbState {
    pub media: Arc<dyn MediaStore>,
    pub users: Arc<dyn UserStore>,
}

impl From<Stores> for DbState {
    fn from(stores: Stores) -> Self {
        Self {
            media: stores.media,
            users: stores.users,
        }
    }
}

/// Blob storage and upload limits.
#[derive(Clone)]
pub struct MediaConfig {
    pub storage: Arc<dyn Storage>,
    pub streamer: RangeStreamer,
    pub max_video_size_bytes: u64,
}

/// Background progress tracking and its notification fan-out.
#[derive(Clone)]
pub struct ProcessingState {
    pub tracker: ProgressTracker,
    pub events: EventBus,
}

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub media: MediaConfig,
    pub processing: ProcessingState,
    pub config: Config,
}

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for MediaConfig {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.media.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ProcessingState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.processing.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
