use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::constants::{DEFAULT_MIME_TYPE, PROGRESS_COMPLETE_PERCENT};
use crate::AppError;

/// Processing lifecycle of a media resource.
///
/// `pending -> processing -> {complete, failed}`; the last two are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl ResourceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResourceStatus::Complete | ResourceStatus::Failed)
    }
}

impl Display for ResourceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ResourceStatus::Pending => write!(f, "pending"),
            ResourceStatus::Processing => write!(f, "processing"),
            ResourceStatus::Complete => write!(f, "complete"),
            ResourceStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Content-safety verdict, recorded once when processing completes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "media_classification", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Safe,
    Flagged,
}

impl Display for Classification {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Classification::Safe => write!(f, "safe"),
            Classification::Flagged => write!(f, "flagged"),
        }
    }
}

/// Persisted record of one uploaded file.
///
/// `stored_path` is the blob storage key and never leaves the server; use
/// [`MediaResourceResponse`] for anything sent to clients.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MediaResource {
    pub id: Uuid,
    pub title: String,
    pub stored_path: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub owner_id: Uuid,
    pub status: ResourceStatus,
    pub progress_percent: i32,
    pub classification: Option<Classification>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaResource {
    pub fn is_streamable(&self) -> bool {
        self.status == ResourceStatus::Complete
    }

    /// Checks the record-level invariants between status, progress and classification.
    pub fn check_invariants(&self) -> Result<(), String> {
        if !(0..=PROGRESS_COMPLETE_PERCENT).contains(&self.progress_percent) {
            return Err(format!("progress {} out of range", self.progress_percent));
        }
        if self.status == ResourceStatus::Complete
            && self.progress_percent != PROGRESS_COMPLETE_PERCENT
        {
            return Err("complete resource must be at 100%".to_string());
        }
        if self.status == ResourceStatus::Pending && self.progress_percent != 0 {
            return Err("pending resource must be at 0%".to_string());
        }
        if self.classification.is_some() && self.status != ResourceStatus::Complete {
            return Err("classification set on a resource that is not complete".to_string());
        }
        Ok(())
    }
}

/// Fields supplied at upload time; everything else is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewMediaResource {
    pub title: String,
    pub stored_path: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub owner_id: Uuid,
}

impl NewMediaResource {
    pub fn new(
        title: impl Into<String>,
        stored_path: impl Into<String>,
        mime_type: Option<String>,
        byte_size: i64,
        owner_id: Uuid,
    ) -> Result<Self, AppError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(AppError::MissingTitle);
        }
        if byte_size < 0 {
            return Err(AppError::InvalidInput(
                "byte size cannot be negative".to_string(),
            ));
        }
        let mime_type = mime_type
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        Ok(Self {
            title,
            stored_path: stored_path.into(),
            mime_type,
            byte_size,
            owner_id,
        })
    }

    /// Materialize the record in its initial `pending` state.
    pub fn into_resource(self, id: Uuid, now: DateTime<Utc>) -> MediaResource {
        MediaResource {
            id,
            title: self.title,
            stored_path: self.stored_path,
            mime_type: self.mime_type,
            byte_size: self.byte_size,
            owner_id: self.owner_id,
            status: ResourceStatus::Pending,
            progress_percent: 0,
            classification: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaResourceResponse {
    pub id: Uuid,
    pub title: String,
    pub mime_type: String,
    pub byte_size: i64,
    pub owner_id: Uuid,
    pub status: ResourceStatus,
    pub progress_percent: i32,
    pub classification: Option<Classification>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MediaResource> for MediaResourceResponse {
    fn from(resource: MediaResource) -> Self {
        MediaResourceResponse {
            id: resource.id,
            title: resource.title,
            mime_type: resource.mime_type,
            byte_size: resource.byte_size,
            owner_id: resource.owner_id,
            status: resource.status,
            progress_percent: resource.progress_percent,
            classification: resource.classification,
            created_at: resource.created_at,
            updated_at: resource.updated_at,
        }
    }
}
