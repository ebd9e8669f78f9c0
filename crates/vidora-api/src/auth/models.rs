use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use vidora_core::models::Principal;
use vidora_core::AppError;

/// The authenticated caller, placed in request extensions by
/// [`auth_middleware`](super::middleware::auth_middleware).
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub Principal);

// Extracted from parts so it can precede `Multipart` in handler arguments
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .map(CurrentUser)
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("No token provided".to_string())))
    }
}
