//! Application setup and initialization
//!
//! `main` only loads configuration and calls [`initialize_app`]; everything
//! else is wired here so integration tests can build the same router.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use crate::telemetry::{init_telemetry, LogFormat};
use anyhow::{Context, Result};
use std::sync::Arc;
use vidora_core::{Config, MetadataStoreKind};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    let log_format: LogFormat = config
        .log_format()
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    init_telemetry(log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        metadata_store = ?config.metadata_store(),
        "Configuration loaded and validated successfully"
    );

    let pool = match config.metadata_store() {
        MetadataStoreKind::Postgres => Some(database::setup_database(&config).await?),
        MetadataStoreKind::Memory => None,
    };

    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, pool, storage)?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
