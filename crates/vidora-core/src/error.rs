//! Error types module
//!
//! Every failure that crosses a crate boundary is an [`AppError`]. The
//! [`ErrorMetadata`] impl decides how each variant is presented to clients:
//! HTTP status, stable machine-readable code, and whether details may leak.
//!
//! The `Database` variant carries a `sqlx::Error` only with the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::models::ResourceStatus;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors such as validation failures
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

/// Self-description of how an error is rendered to a client.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "VIDEO_NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid video id: {0}")]
    InvalidIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("No video file uploaded")]
    MissingFile,

    #[error("Video title is required")]
    MissingTitle,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Video is not ready for streaming (status {status}, progress {progress}%)")]
    NotReady {
        status: ResourceStatus,
        progress: i32,
    },

    #[error("Backing file missing: {0}")]
    FileMissing(String),

    #[error("Requested range not satisfiable for length {total}")]
    RangeNotSatisfiable { total: u64 },

    #[error("Stream I/O failure: {0}")]
    StreamIo(#[source] io::Error),

    #[error("Tracker failed to persist progress: {0}")]
    TrackerPersist(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// (http_status, error_code, recoverable, suggested_action, sensitive, log_level) per variant.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidIdentifier(_) => (
            400,
            "INVALID_VIDEO_ID",
            false,
            Some("Use the id returned by the upload or list endpoints"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "VIDEO_NOT_FOUND",
            false,
            Some("Verify the video ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            None,
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Log in again to obtain a fresh token"),
            false,
            LogLevel::Debug,
        ),
        AppError::UserExists(_) => (
            409,
            "USER_EXISTS",
            false,
            Some("Log in instead or register with another email"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidCredentials => (
            400,
            "INVALID_CREDENTIALS",
            false,
            Some("Check email and password"),
            false,
            LogLevel::Debug,
        ),
        AppError::MissingFile => (
            400,
            "MISSING_FILE",
            false,
            Some("Attach the file in the 'video' form field"),
            false,
            LogLevel::Debug,
        ),
        AppError::MissingTitle => (
            400,
            "MISSING_TITLE",
            false,
            Some("Provide a non-empty 'title' form field"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidState(_) => (
            409,
            "INVALID_STATE",
            false,
            None,
            false,
            LogLevel::Warn,
        ),
        AppError::NotReady { .. } => (
            400,
            "VIDEO_NOT_READY",
            true,
            Some("Poll the video status and retry once processing completes"),
            false,
            LogLevel::Debug,
        ),
        AppError::FileMissing(_) => (
            404,
            "FILE_NOT_FOUND",
            false,
            Some("Re-upload the video"),
            true,
            LogLevel::Error,
        ),
        AppError::RangeNotSatisfiable { .. } => (
            416,
            "INVALID_RANGE",
            false,
            Some("Request a range that starts inside the file"),
            false,
            LogLevel::Debug,
        ),
        AppError::StreamIo(_) => (
            500,
            "STREAM_ERROR",
            true,
            Some("Retry the request"),
            true,
            LogLevel::Error,
        ),
        AppError::TrackerPersist(_) => (
            500,
            "TRACKER_PERSIST_FAILED",
            false,
            None,
            true,
            LogLevel::Error,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::InvalidIdentifier(_) => "InvalidIdentifier",
            AppError::NotFound(_) => "NotFound",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::UserExists(_) => "UserExists",
            AppError::InvalidCredentials => "InvalidCredentials",
            AppError::MissingFile => "MissingFile",
            AppError::MissingTitle => "MissingTitle",
            AppError::InvalidState(_) => "InvalidState",
            AppError::NotReady { .. } => "NotReady",
            AppError::FileMissing(_) => "FileMissing",
            AppError::RangeNotSatisfiable { .. } => "RangeNotSatisfiable",
            AppError::StreamIo(_) => "StreamIo",
            AppError::TrackerPersist(_) => "TrackerPersist",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Structured payload attached to the response body, if the variant has one.
    pub fn data(&self) -> Option<serde_json::Value> {
        match self {
            AppError::NotReady { status, progress } => Some(serde_json::json!({
                "status": status,
                "progress": progress,
            })),
            _ => None,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::InvalidIdentifier(_) => "Invalid video ID".to_string(),
            AppError::NotFound(_) => "Video not found".to_string(),
            AppError::Forbidden(_) => "Not authorized to access this video".to_string(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::UserExists(_) => "User already exists".to_string(),
            AppError::InvalidCredentials => "Invalid credentials".to_string(),
            AppError::MissingFile => "No video file uploaded".to_string(),
            AppError::MissingTitle => "Video title is required".to_string(),
            AppError::InvalidState(ref msg) => msg.clone(),
            AppError::NotReady { .. } => "Video is not ready for streaming yet".to_string(),
            // The internal message may carry a filesystem path
            AppError::FileMissing(_) => "Video file not found".to_string(),
            AppError::RangeNotSatisfiable { total } => {
                format!("Requested range not satisfiable (size {})", total)
            }
            AppError::StreamIo(_) => "Error streaming video".to_string(),
            AppError::TrackerPersist(_) => "Video processing failed".to_string(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
