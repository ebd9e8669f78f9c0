//! OpenAPI documentation, served at `/api/openapi.json` and browsable at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use vidora_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vidora API",
        version = "0.1.0",
        description = "Video upload, simulated processing with live progress, and byte-range streaming."
    ),
    paths(
        // Auth
        handlers::auth::register,
        handlers::auth::login,
        // Videos
        handlers::video_upload::upload_video,
        handlers::video_get::list_videos,
        handlers::video_get::get_video,
        handlers::video_stream::stream_video,
        handlers::events::video_events,
        // Health
        handlers::misc::health,
    ),
    components(
        schemas(
            models::MediaResourceResponse,
            models::ResourceStatus,
            models::Classification,
            models::UserResponse,
            models::Role,
            handlers::auth::RegisterRequest,
            handlers::auth::LoginRequest,
            handlers::auth::AuthResponse,
            handlers::video_upload::UploadResponse,
            handlers::video_upload::UploadData,
            error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "videos", description = "Video upload, status, progress events and streaming"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
