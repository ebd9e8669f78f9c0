//! Unauthenticated utility routes.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

pub async fn root() -> &'static str {
    "Vidora video API is running"
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// The old single-step upload endpoint; uploads now go through `/api/videos/upload`.
pub async fn upload_gone() -> impl IntoResponse {
    (
        StatusCode::GONE,
        Json(json!({
            "status": "gone",
            "message": "This endpoint has been removed. Use POST /api/videos/upload instead.",
        })),
    )
}
