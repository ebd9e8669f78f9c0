use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use vidora_core::constants::PROGRESS_COMPLETE_PERCENT;
use vidora_core::models::{Classification, MediaResource, NewMediaResource};
use vidora_core::AppError;

const RESOURCE_COLUMNS: &str = "id, title, stored_path, mime_type, byte_size, owner_id, status, \
     progress_percent, classification, created_at, updated_at";

/// Persistence for media resources.
///
/// Every lifecycle write is a compare-and-set keyed by id: it applies only if
/// the stored row is still in the expected state and reports whether it did.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Insert a new resource in `pending` state.
    async fn create(&self, new: NewMediaResource) -> Result<MediaResource, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<MediaResource>, AppError>;

    /// Resources uploaded by `owner_id`, newest first.
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<MediaResource>, AppError>;

    /// `pending -> processing` with progress reset to 0.
    ///
    /// Returns the updated row, or `None` if the resource is absent or no
    /// longer pending.
    async fn begin_processing(&self, id: Uuid) -> Result<Option<MediaResource>, AppError>;

    /// Move progress from `from` to `to` while the resource is processing.
    ///
    /// Applies only when the stored progress equals `from` and `to > from`.
    async fn advance_progress(&self, id: Uuid, from: i32, to: i32) -> Result<bool, AppError>;

    /// `processing -> complete` at 100%, recording `classification`.
    ///
    /// Applies only when the stored progress equals `from` and no
    /// classification has been recorded yet.
    async fn complete(
        &self,
        id: Uuid,
        from: i32,
        classification: Classification,
    ) -> Result<bool, AppError>;

    /// Force a non-terminal resource into `failed`.
    async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgMediaStore {
    pool: PgPool,
}

impl PgMediaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    #[tracing::instrument(skip(self, new), fields(owner_id = %new.owner_id, byte_size = new.byte_size))]
    async fn create(&self, new: NewMediaResource) -> Result<MediaResource, AppError> {
        let query = format!(
            "INSERT INTO media_resources (id, title, stored_path, mime_type, byte_size, owner_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            RESOURCE_COLUMNS
        );
        let resource = sqlx::query_as::<_, MediaResource>(&query)
            .bind(Uuid::new_v4())
            .bind(&new.title)
            .bind(&new.stored_path)
            .bind(&new.mime_type)
            .bind(new.byte_size)
            .bind(new.owner_id)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(video_id = %resource.id, "Media resource created");
        Ok(resource)
    }

    #[tracing::instrument(skip(self), fields(video_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
        let query = format!(
            "SELECT {} FROM media_resources WHERE id = $1",
            RESOURCE_COLUMNS
        );
        let resource = sqlx::query_as::<_, MediaResource>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(resource)
    }

    #[tracing::instrument(skip(self), fields(owner_id = %owner_id))]
    async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<MediaResource>, AppError> {
        let query = format!(
            "SELECT {} FROM media_resources WHERE owner_id = $1 ORDER BY created_at DESC, id DESC",
            RESOURCE_COLUMNS
        );
        let resources = sqlx::query_as::<_, MediaResource>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(resources)
    }

    #[tracing::instrument(skip(self), fields(video_id = %id))]
    async fn begin_processing(&self, id: Uuid) -> Result<Option<MediaResource>, AppError> {
        let query = format!(
            "UPDATE media_resources \
             SET status = 'processing', progress_percent = 0, updated_at = NOW() \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {}",
            RESOURCE_COLUMNS
        );
        let resource = sqlx::query_as::<_, MediaResource>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(resource)
    }

    #[tracing::instrument(skip(self), fields(video_id = %id, from = from, to = to))]
    async fn advance_progress(&self, id: Uuid, from: i32, to: i32) -> Result<bool, AppError> {
        if to <= from || to > PROGRESS_COMPLETE_PERCENT {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE media_resources
            SET progress_percent = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'processing' AND progress_percent = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self), fields(video_id = %id, from = from, classification = %classification))]
    async fn complete(
        &self,
        id: Uuid,
        from: i32,
        classification: Classification,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE media_resources
            SET status = 'complete', progress_percent = $3, classification = $4, updated_at = NOW()
            WHERE id = $1
              AND status = 'processing'
              AND progress_percent = $2
              AND classification IS NULL
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(PROGRESS_COMPLETE_PERCENT)
        .bind(classification)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self), fields(video_id = %id))]
    async fn mark_failed(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE media_resources
            SET status = 'failed', updated_at = NOW()
            WHERE id = $1 AND status IN ('pending', 'processing')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
