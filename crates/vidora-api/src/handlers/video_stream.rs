use crate::auth::models::CurrentUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::streamer::MediaStream;
use crate::state::MediaConfig;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap},
};

#[utoipa::path(
    get,
    path = "/api/videos/stream/{id}",
    tag = "videos",
    params(
        ("id" = String, Path, description = "Video ID"),
        ("Range" = Option<String>, Header, description = "Single byte range, e.g. `bytes=0-1023` or `bytes=-500`"),
        ("token" = Option<String>, Query, description = "JWT for clients that cannot send headers")
    ),
    responses(
        (status = 200, description = "Entire file", content_type = "video/mp4"),
        (status = 206, description = "Requested byte range", content_type = "video/mp4"),
        (status = 400, description = "Malformed ID, or video not ready (data carries status and progress)", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Video or its file not found", body = ErrorResponse),
        (status = 416, description = "Range not satisfiable", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(media, headers), fields(user_id = %user.id))]
pub async fn stream_video(
    State(media): State<MediaConfig>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<MediaStream, HttpAppError> {
    // A Range header that is not visible ASCII is malformed, not absent
    let range = headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());
    Ok(media.streamer.open(&id, &user, range).await?)
}
