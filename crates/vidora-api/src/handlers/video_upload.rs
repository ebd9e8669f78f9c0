use crate::auth::models::CurrentUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{multipart::Field, multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;
use uuid::Uuid;
use vidora_core::models::{MediaResource, MediaResourceResponse, NewMediaResource};
use vidora_core::AppError;
use vidora_storage::generate_upload_key;

/// Chunks buffered between the multipart reader and the storage writer.
const UPLOAD_CHANNEL_DEPTH: usize = 8;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadData {
    pub video: MediaResourceResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub status: String,
    pub message: String,
    pub data: UploadData,
}

struct StoredFile {
    key: String,
    content_type: Option<String>,
    size: u64,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::InvalidInput(format!("Failed to read multipart: {}", e))
    }
}

/// Stream one multipart file field into blob storage without buffering it.
async fn store_video_field(
    state: &AppState,
    mut field: Field<'_>,
) -> Result<StoredFile, AppError> {
    let original_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field
        .content_type()
        .map(|ct| ct.to_string())
        .filter(|ct| !ct.is_empty());
    let key = generate_upload_key(&original_name, chrono::Utc::now().timestamp_millis());
    let max_size = state.media.max_video_size_bytes;

    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(UPLOAD_CHANNEL_DEPTH);
    let storage = state.media.storage.clone();
    let upload_key = key.clone();
    let upload_content_type = content_type.clone().unwrap_or_default();
    let writer = tokio::spawn(async move {
        let reader = StreamReader::new(ReceiverStream::new(rx));
        storage
            .upload_stream(&upload_key, &upload_content_type, Box::pin(reader))
            .await
    });

    let mut received: u64 = 0;
    let mut read_error = None;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                received += chunk.len() as u64;
                if received > max_size {
                    read_error = Some(AppError::PayloadTooLarge(format!(
                        "File size exceeds maximum allowed size of {} MB",
                        max_size / 1024 / 1024
                    )));
                    break;
                }
                if tx.send(Ok(chunk)).await.is_err() {
                    // Writer gave up; its error is reported below
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                read_error = Some(multipart_error(e));
                break;
            }
        }
    }

    if read_error.is_some() {
        // Failing the reader makes storage discard the partial file
        let _ = tx
            .send(Err(io::Error::other("upload aborted")))
            .await;
    }
    drop(tx);

    let written = writer
        .await
        .map_err(|e| AppError::Internal(format!("Upload task failed: {}", e)))?;

    if let Some(err) = read_error {
        return Err(err);
    }
    let size = written?;

    Ok(StoredFile {
        key,
        content_type,
        size,
    })
}

async fn discard(state: &AppState, key: &str) {
    if let Err(e) = state.media.storage.delete(key).await {
        tracing::warn!(key = %key, error = %e, "Failed to remove rejected upload");
    }
}

/// Read the `video` and `title` fields. The video is stored as soon as it is
/// seen; on error the caller still owns whatever landed in `stored`.
async fn read_upload_fields(
    state: &AppState,
    multipart: &mut Multipart,
    title: &mut Option<String>,
    stored: &mut Option<StoredFile>,
) -> Result<(), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("video") if stored.is_none() => {
                *stored = Some(store_video_field(state, field).await?);
            }
            Some("title") => {
                *title = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }
    Ok(())
}

async fn create_resource(
    state: &AppState,
    owner_id: Uuid,
    file: &StoredFile,
    title: Option<String>,
) -> Result<MediaResource, AppError> {
    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or(AppError::MissingTitle)?;
    let new_resource = NewMediaResource::new(
        title.trim(),
        file.key.clone(),
        file.content_type.clone(),
        file.size as i64,
        owner_id,
    )?;
    state.db.media.create(new_resource).await
}

#[utoipa::path(
    post,
    path = "/api/videos/upload",
    tag = "videos",
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Fields: `video` (file), `title` (text)"),
    responses(
        (status = 201, description = "Video uploaded, processing started", body = UploadResponse),
        (status = 400, description = "Missing file or title", body = ErrorResponse),
        (status = 403, description = "Role may not upload", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(user_id = %user.id))]
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    if !user.can_upload() {
        return Err(AppError::Forbidden(format!("role {} cannot upload videos", user.role)).into());
    }

    let mut title: Option<String> = None;
    let mut stored: Option<StoredFile> = None;

    if let Err(e) = read_upload_fields(&state, &mut multipart, &mut title, &mut stored).await {
        if let Some(file) = &stored {
            discard(&state, &file.key).await;
        }
        return Err(e.into());
    }

    let file = stored.ok_or(AppError::MissingFile)?;

    let created = match create_resource(&state, user.id, &file, title).await {
        Ok(created) => created,
        Err(e) => {
            discard(&state, &file.key).await;
            return Err(e.into());
        }
    };
    tracing::info!(
        video_id = %created.id,
        byte_size = created.byte_size,
        "Video uploaded"
    );

    let tracker = &state.processing.tracker;
    let started = match tracker.start(created.id, state.processing.events.sink()).await {
        Ok(started) => started,
        Err(e) => {
            // Never leave a pending record that nothing will advance
            if let Err(mark_err) = state.db.media.mark_failed(created.id).await {
                tracing::error!(
                    video_id = %created.id,
                    error = %mark_err,
                    "Failed to mark unstarted upload as failed"
                );
            }
            discard(&state, &file.key).await;
            return Err(e.into());
        }
    };
    tracing::debug!(running_trackers = tracker.running_count(), "Tracker started");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            status: "success".to_string(),
            message: "Video uploaded successfully".to_string(),
            data: UploadData {
                video: started.into(),
            },
        }),
    ))
}
