//! Configuration module
//!
//! Settings are read from the process environment (after loading `.env` via
//! `dotenvy`) and validated once at startup.

use std::env;
use std::time::Duration;

use crate::store_types::MetadataStoreKind;

const SERVER_PORT: u16 = 4000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const JWT_EXPIRY_HOURS: i64 = 24;
const MAX_VIDEO_SIZE_MB: u64 = 500;
const PROCESSING_TICK_MS: u64 = 1000;
const EVENT_CHANNEL_CAPACITY: usize = 256;
const STORAGE_PATH: &str = "uploads";

/// Settings shared by every HTTP-facing service
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    /// `compact` (default) or `json`
    pub log_format: String,
}

#[derive(Clone, Debug)]
pub struct MediaServerConfig {
    pub base: BaseConfig,
    pub metadata_store: MetadataStoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Root directory of the local blob store
    pub storage_path: String,
    pub max_video_size_bytes: u64,
    /// Interval between two progress steps of the tracker
    pub processing_tick_ms: u64,
    pub event_channel_capacity: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<MediaServerConfig>);

impl Config {
    fn as_media(&self) -> &MediaServerConfig {
        &self.0
    }

    pub fn new(config: MediaServerConfig) -> Self {
        Config(Box::new(config))
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.as_media().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = MediaServerConfig::from_env()?;
        Ok(Config::new(config))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_media().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_media().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_media().base.environment
    }

    pub fn jwt_secret(&self) -> &str {
        &self.as_media().base.jwt_secret
    }

    pub fn jwt_expiry_hours(&self) -> i64 {
        self.as_media().base.jwt_expiry_hours
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_media().base.cors_origins
    }

    pub fn log_format(&self) -> &str {
        &self.as_media().base.log_format
    }

    pub fn metadata_store(&self) -> MetadataStoreKind {
        self.as_media().metadata_store
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_media().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_media().db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_media().db_timeout_seconds
    }

    pub fn storage_path(&self) -> &str {
        &self.as_media().storage_path
    }

    pub fn max_video_size_bytes(&self) -> u64 {
        self.as_media().max_video_size_bytes
    }

    pub fn processing_tick(&self) -> Duration {
        Duration::from_millis(self.as_media().processing_tick_ms)
    }

    pub fn event_channel_capacity(&self) -> usize {
        self.as_media().event_channel_capacity
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

impl MediaServerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from an arbitrary key lookup, applying defaults.
    ///
    /// Does not validate; callers run [`MediaServerConfig::validate`] afterwards.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: lookup("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            jwt_secret: lookup("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?,
            jwt_expiry_hours: lookup("JWT_EXPIRY_HOURS")
                .and_then(|s| s.parse().ok())
                .filter(|&h: &i64| h > 0)
                .unwrap_or(JWT_EXPIRY_HOURS),
            log_format: lookup("LOG_FORMAT")
                .map(|s| s.to_lowercase())
                .unwrap_or_else(|| "compact".to_string()),
        };

        let metadata_store = match lookup("METADATA_STORE") {
            Some(raw) => raw.parse::<MetadataStoreKind>()?,
            None => MetadataStoreKind::Postgres,
        };

        Ok(MediaServerConfig {
            base,
            metadata_store,
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: lookup("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_path: lookup("STORAGE_PATH")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| STORAGE_PATH.to_string()),
            max_video_size_bytes: lookup("MAX_VIDEO_SIZE_MB")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(MAX_VIDEO_SIZE_MB)
                * 1024
                * 1024,
            processing_tick_ms: lookup("PROCESSING_TICK_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(PROCESSING_TICK_MS),
            event_channel_capacity: lookup("EVENT_CHANNEL_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(EVENT_CHANNEL_CAPACITY),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if is_production_name(&self.base.environment)
            && self.base.cors_origins.iter().any(|o| o == "*")
        {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.metadata_store == MetadataStoreKind::Postgres {
            match self.database_url.as_deref() {
                Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {}
                Some(_) => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when METADATA_STORE=postgres"
                    ))
                }
            }
        }

        if self.processing_tick_ms == 0 {
            return Err(anyhow::anyhow!("PROCESSING_TICK_MS must be greater than 0"));
        }

        if self.event_channel_capacity == 0 {
            return Err(anyhow::anyhow!(
                "EVENT_CHANNEL_CAPACITY must be greater than 0"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MediaServerConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("METADATA_STORE", "memory"),
        ]))
        .unwrap();
        config.validate().unwrap();

        let config = Config::new(config);
        assert_eq!(config.server_port(), 4000);
        assert_eq!(config.jwt_expiry_hours(), 24);
        assert_eq!(config.metadata_store(), MetadataStoreKind::Memory);
        assert_eq!(config.storage_path(), "uploads");
        assert_eq!(config.max_video_size_bytes(), 500 * 1024 * 1024);
        assert_eq!(config.processing_tick(), Duration::from_millis(1000));
        assert_eq!(config.cors_origins(), ["*".to_string()]);
        assert!(!config.is_production());
    }

    #[test]
    fn test_missing_jwt_secret_rejected() {
        assert!(MediaServerConfig::from_lookup(lookup_from(&[])).is_err());

        let config =
            MediaServerConfig::from_lookup(lookup_from(&[("JWT_SECRET", "short")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let config =
            MediaServerConfig::from_lookup(lookup_from(&[("JWT_SECRET", SECRET)])).unwrap();
        assert!(config.validate().is_err());

        let config = MediaServerConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("DATABASE_URL", "postgres://vidora@localhost/vidora"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let config = MediaServerConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("METADATA_STORE", "memory"),
            ("APP_ENV", "production"),
        ]))
        .unwrap();
        assert!(config.validate().is_err());

        let config = MediaServerConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("METADATA_STORE", "memory"),
            ("APP_ENV", "production"),
            ("CORS_ORIGINS", "https://app.example.com, https://admin.example.com"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.base.cors_origins.len(), 2);
    }

    #[test]
    fn test_unknown_metadata_store_rejected() {
        let result = MediaServerConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("METADATA_STORE", "mongodb"),
        ]));
        assert!(result.is_err());
    }
}
