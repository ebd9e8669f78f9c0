//! Byte-range streaming of completed videos.
//!
//! [`RangeStreamer::open`] runs every check that can still be reported as a
//! normal error (id, existence, ownership, readiness, backing file, range)
//! before any response metadata exists. Once the [`MediaStream`] is turned
//! into a response the status line is committed, so later read failures are
//! only logged and the body is cut short.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use uuid::Uuid;
use vidora_core::models::{MediaResource, Principal, ResourceStatus};
use vidora_core::AppError;
use vidora_db::MediaStore;
use vidora_storage::{ByteStream, Storage, StorageError};

use crate::error::HttpAppError;

/// A single `Range: bytes=...` request as sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=start-` or `bytes=start-end` (inclusive).
    FromStart { start: u64, end: Option<u64> },
    /// `bytes=-n`: the last `n` bytes.
    Suffix(u64),
}

impl ByteRange {
    /// Parse a `Range` header value.
    ///
    /// Returns `None` for anything other than a single well-formed byte range.
    pub fn parse(value: &str) -> Option<Self> {
        let ranges = value.trim().strip_prefix("bytes=")?.trim();
        if ranges.contains(',') {
            return None;
        }
        let (start, end) = ranges.split_once('-')?;
        let (start, end) = (start.trim(), end.trim());

        if start.is_empty() {
            return end.parse().ok().map(ByteRange::Suffix);
        }

        let start: u64 = start.parse().ok()?;
        let end = if end.is_empty() {
            None
        } else {
            let end: u64 = end.parse().ok()?;
            if end < start {
                return None;
            }
            Some(end)
        };
        Some(ByteRange::FromStart { start, end })
    }

    /// Resolve against a file of `total` bytes into an inclusive `(start, end)`.
    ///
    /// An `end` past the file is clamped to the last byte; a `start` past it
    /// cannot be served.
    pub fn resolve(self, total: u64) -> Result<(u64, u64), AppError> {
        let unsatisfiable = AppError::RangeNotSatisfiable { total };
        if total == 0 {
            return Err(unsatisfiable);
        }
        let last = total - 1;
        match self {
            ByteRange::FromStart { start, .. } if start >= total => Err(unsatisfiable),
            ByteRange::FromStart { start, end } => {
                Ok((start, end.map_or(last, |end| end.min(last))))
            }
            ByteRange::Suffix(0) => Err(unsatisfiable),
            ByteRange::Suffix(n) => Ok((total.saturating_sub(n), last)),
        }
    }
}

/// A validated, opened video body plus the metadata for its response head.
pub struct MediaStream {
    pub video_id: Uuid,
    pub mime_type: String,
    pub total_length: u64,
    /// Inclusive byte window for a partial response; `None` for the whole file.
    pub range: Option<(u64, u64)>,
    body: ByteStream,
}

impl MediaStream {
    pub fn content_length(&self) -> u64 {
        match self.range {
            Some((start, end)) => end - start + 1,
            None => self.total_length,
        }
    }
}

impl IntoResponse for MediaStream {
    fn into_response(self) -> Response {
        let content_length = self.content_length();
        let builder = match self.range {
            Some((start, end)) => Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, self.total_length),
                )
                .header(header::ACCEPT_RANGES, "bytes"),
            None => Response::builder().status(StatusCode::OK),
        };

        let body = GuardedBody::new(self.body, self.video_id, content_length);
        builder
            .header(header::CONTENT_LENGTH, content_length)
            .header(header::CONTENT_TYPE, self.mime_type)
            .body(Body::from_stream(body))
            .unwrap_or_else(|e| {
                HttpAppError(AppError::Internal(format!(
                    "Failed to build stream response: {}",
                    e
                )))
                .into_response()
            })
    }
}

/// Serves completed videos out of blob storage.
#[derive(Clone)]
pub struct RangeStreamer {
    media: Arc<dyn MediaStore>,
    storage: Arc<dyn Storage>,
}

impl RangeStreamer {
    pub fn new(media: Arc<dyn MediaStore>, storage: Arc<dyn Storage>) -> Self {
        Self { media, storage }
    }

    /// Validate a stream request and open the requested bytes.
    #[tracing::instrument(skip(self, principal, range_header), fields(user_id = %principal.id))]
    pub async fn open(
        &self,
        raw_id: &str,
        principal: &Principal,
        range_header: Option<&str>,
    ) -> Result<MediaStream, AppError> {
        let video_id =
            Uuid::parse_str(raw_id).map_err(|_| AppError::InvalidIdentifier(raw_id.to_string()))?;

        let resource = self
            .media
            .get(video_id)
            .await?
            .ok_or_else(|| AppError::NotFound(video_id.to_string()))?;

        authorize(&resource, principal)?;

        if resource.status != ResourceStatus::Complete {
            return Err(AppError::NotReady {
                status: resource.status,
                progress: resource.progress_percent,
            });
        }

        let total_length = self.storage.content_length(&resource.stored_path).await?;

        let range = match range_header {
            Some(value) => {
                let requested = ByteRange::parse(value).ok_or(AppError::RangeNotSatisfiable {
                    total: total_length,
                })?;
                Some(requested.resolve(total_length)?)
            }
            None => None,
        };

        let (offset, length) = match range {
            Some((start, end)) => (start, Some(end - start + 1)),
            None => (0, None),
        };
        let body = self
            .storage
            .download_range_stream(&resource.stored_path, offset, length)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(key) => AppError::FileMissing(key),
                other => AppError::StreamIo(io::Error::other(other.to_string())),
            })?;

        tracing::info!(
            video_id = %video_id,
            total_length,
            range = ?range,
            "Streaming video"
        );

        Ok(MediaStream {
            video_id,
            mime_type: resource.mime_type,
            total_length,
            range,
            body,
        })
    }
}

fn authorize(resource: &MediaResource, principal: &Principal) -> Result<(), AppError> {
    if principal.can_access(resource.owner_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {} cannot access video {}",
            principal.id, resource.id
        )))
    }
}

/// Response body that logs failures after headers are sent and refuses to end
/// quietly short of the declared length.
struct GuardedBody {
    inner: ByteStream,
    video_id: Uuid,
    expected: u64,
    sent: u64,
    finished: bool,
}

impl GuardedBody {
    fn new(inner: ByteStream, video_id: Uuid, expected: u64) -> Self {
        Self {
            inner,
            video_id,
            expected,
            sent: 0,
            finished: false,
        }
    }
}

impl Stream for GuardedBody {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match ready!(self.inner.poll_next_unpin(cx)) {
            Some(Ok(chunk)) => {
                self.sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                self.finished = true;
                tracing::error!(
                    video_id = %self.video_id,
                    bytes_sent = self.sent,
                    error = %e,
                    "Video stream failed after response started"
                );
                Poll::Ready(Some(Err(io::Error::other(e.to_string()))))
            }
            None if self.sent < self.expected => {
                self.finished = true;
                tracing::error!(
                    video_id = %self.video_id,
                    bytes_sent = self.sent,
                    expected = self.expected,
                    "Video file ended before declared length"
                );
                Poll::Ready(Some(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "video file shorter than declared length",
                ))))
            }
            None => {
                self.finished = true;
                tracing::debug!(video_id = %self.video_id, bytes_sent = self.sent, "Video stream finished");
                Poll::Ready(None)
            }
        }
    }
}

impl Drop for GuardedBody {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!(
                video_id = %self.video_id,
                bytes_sent = self.sent,
                "Client disconnected before stream finished"
            );
        }
    }
}
