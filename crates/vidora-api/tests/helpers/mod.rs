//! Shared setup for API integration tests.
//!
//! Every test gets its own in-memory stores, a temp storage directory and a
//! deterministic classifier, so no external services are needed.

#![allow(dead_code)]

pub mod auth;
pub mod faults;
pub mod fixtures;

use axum_test::TestServer;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use vidora_api::setup::routes::setup_routes;
use vidora_api::setup::services::build_state;
use vidora_api::state::{AppState, DbState};
use vidora_core::config::MediaServerConfig;
use vidora_core::models::{Classification, ResourceStatus};
use vidora_core::Config;
use vidora_db::{InMemoryUserStore, MediaStore, Stores};
use vidora_processing::FixedClassifier;
use vidora_storage::LocalStorage;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

/// Fast enough that five steps finish well inside a test.
pub const FAST_TICK_MS: u64 = 10;

/// Slow enough that nothing advances while a test runs.
pub const FROZEN_TICK_MS: u64 = 60_000;

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub storage_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Every file currently under the storage root, as relative paths.
    pub fn stored_files(&self) -> Vec<String> {
        fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(root, &path, out);
                } else if let Ok(relative) = path.strip_prefix(root) {
                    out.push(relative.to_string_lossy().to_string());
                }
            }
        }
        let mut out = Vec::new();
        walk(self.storage_dir.path(), self.storage_dir.path(), &mut out);
        out
    }
}

pub fn test_config(storage_path: &str, tick_ms: u64, max_video_mb: u64) -> Config {
    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("ENVIRONMENT", "test".to_string());
    vars.insert("JWT_SECRET", TEST_JWT_SECRET.to_string());
    vars.insert("METADATA_STORE", "memory".to_string());
    vars.insert("STORAGE_PATH", storage_path.to_string());
    vars.insert("PROCESSING_TICK_MS", tick_ms.to_string());
    vars.insert("MAX_VIDEO_SIZE_MB", max_video_mb.to_string());

    let config = MediaServerConfig::from_lookup(|key| vars.get(key).cloned())
        .expect("Failed to build test config");
    config.validate().expect("Test config should be valid");
    Config::new(config)
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(FAST_TICK_MS, Classification::Safe, 500).await
}

pub async fn setup_test_app_with(
    tick_ms: u64,
    classification: Classification,
    max_video_mb: u64,
) -> TestApp {
    build_test_app(tick_ms, classification, max_video_mb, DbState::from(Stores::in_memory())).await
}

/// Same as [`setup_test_app`] but with a caller-supplied media store.
pub async fn setup_test_app_with_media(media: Arc<dyn MediaStore>) -> TestApp {
    let db = DbState {
        media,
        users: Arc::new(InMemoryUserStore::new()),
    };
    build_test_app(FAST_TICK_MS, Classification::Safe, 500, db).await
}

async fn build_test_app(
    tick_ms: u64,
    classification: Classification,
    max_video_mb: u64,
    db: DbState,
) -> TestApp {
    let storage_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let storage_path = storage_dir.path().to_string_lossy().to_string();
    let config = test_config(&storage_path, tick_ms, max_video_mb);

    let storage = LocalStorage::new(storage_dir.path())
        .await
        .expect("Failed to create local storage");

    let state = build_state(
        config.clone(),
        db,
        Arc::new(storage),
        Arc::new(FixedClassifier(classification)),
    );

    let router = setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        storage_dir,
    }
}

/// Poll the metadata endpoint until the video reaches a terminal status.
pub async fn wait_until_terminal(client: &TestServer, token: &str, video_id: Uuid) -> ResourceStatus {
    for _ in 0..200 {
        let response = client
            .get(&format!("/api/videos/{}", video_id))
            .add_header("Authorization", format!("Bearer {}", token))
            .await;
        assert_eq!(response.status_code(), 200);

        let video: serde_json::Value = response.json();
        let status: ResourceStatus =
            serde_json::from_value(video["status"].clone()).expect("status should deserialize");
        if status.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(FAST_TICK_MS)).await;
    }
    panic!("video {} never finished processing", video_id);
}
