use crate::auth::models::CurrentUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::DbState;
use axum::{
    extract::{Path, State},
    Json,
};
use vidora_core::models::MediaResourceResponse;
use vidora_core::AppError;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/videos",
    tag = "videos",
    responses(
        (status = 200, description = "Caller's videos, newest first", body = Vec<MediaResourceResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(db), fields(user_id = %user.id))]
pub async fn list_videos(
    State(db): State<DbState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<MediaResourceResponse>>, HttpAppError> {
    let videos = db.media.list_by_owner(user.id).await?;
    Ok(Json(videos.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/videos/{id}",
    tag = "videos",
    params(
        ("id" = String, Path, description = "Video ID")
    ),
    responses(
        (status = 200, description = "Video metadata and processing progress", body = MediaResourceResponse),
        (status = 400, description = "Malformed video ID", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(db), fields(user_id = %user.id))]
pub async fn get_video(
    State(db): State<DbState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MediaResourceResponse>, HttpAppError> {
    let video_id = Uuid::parse_str(&id).map_err(|_| AppError::InvalidIdentifier(id.clone()))?;

    let video = db
        .media
        .get(video_id)
        .await?
        .ok_or_else(|| AppError::NotFound(video_id.to_string()))?;

    if !user.can_access(video.owner_id) {
        return Err(AppError::Forbidden(format!(
            "user {} cannot access video {}",
            user.id, video.id
        ))
        .into());
    }

    Ok(Json(video.into()))
}
