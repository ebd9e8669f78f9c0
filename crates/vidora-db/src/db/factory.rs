use sqlx::PgPool;
use std::sync::Arc;
use vidora_core::{AppError, Config, MetadataStoreKind};

use super::media::{MediaStore, PgMediaStore};
use super::memory::{InMemoryMediaStore, InMemoryUserStore};
use super::user::{PgUserStore, UserStore};

/// The repositories the API is wired with.
#[derive(Clone)]
pub struct Stores {
    pub media: Arc<dyn MediaStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            media: Arc::new(InMemoryMediaStore::new()),
            users: Arc::new(InMemoryUserStore::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            media: Arc::new(PgMediaStore::new(pool.clone())),
            users: Arc::new(PgUserStore::new(pool)),
        }
    }
}

/// Build the stores selected by `METADATA_STORE`.
///
/// A pool is required for the PostgreSQL backend and ignored otherwise.
pub fn create_stores(config: &Config, pool: Option<PgPool>) -> Result<Stores, AppError> {
    match config.metadata_store() {
        MetadataStoreKind::Postgres => {
            let pool = pool.ok_or_else(|| {
                AppError::Internal("PostgreSQL metadata store requires a connection pool".into())
            })?;
            tracing::info!("Using PostgreSQL metadata store");
            Ok(Stores::postgres(pool))
        }
        MetadataStoreKind::Memory => {
            tracing::warn!("Using in-memory metadata store; data is lost on restart");
            Ok(Stores::in_memory())
        }
    }
}
