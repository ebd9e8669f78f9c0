use crate::auth::jwt::verify_token;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use vidora_core::AppError;
use vidora_db::UserStore;

#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
    pub users: Arc<dyn UserStore>,
}

/// Bearer token from the `Authorization` header, else the `token` query
/// parameter (media elements cannot set headers).
fn extract_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        request.uri().query().and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "token")
                .map(|(_, value)| value.to_string())
                .filter(|token| !token.is_empty())
        })
    })
}

/// Verify the caller's JWT, confirm the user still exists and attach their
/// [`Principal`](vidora_core::models::Principal) to the request.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    let token = extract_token(&request)
        .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;

    let claims = verify_token(&token, &auth.jwt_secret)?;

    let user = auth
        .users
        .get(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let principal = user.principal();
    tracing::debug!(user_id = %principal.id, role = %principal.role, "Request authenticated");

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(uri: &str, authorization: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_token_prefers_header() {
        let req = request("/api/videos?token=query", Some("Bearer header"));
        assert_eq!(extract_token(&req).as_deref(), Some("header"));
    }

    #[test]
    fn test_extract_token_falls_back_to_query() {
        let req = request("/api/videos/stream/abc?foo=1&token=abc.def.ghi", None);
        assert_eq!(extract_token(&req).as_deref(), Some("abc.def.ghi"));

        let req = request("/api/videos", Some("Basic dXNlcg=="));
        assert_eq!(extract_token(&req), None);
    }

    #[test]
    fn test_extract_token_missing() {
        assert_eq!(extract_token(&request("/api/videos", None)), None);
        assert_eq!(extract_token(&request("/api/videos?token=", None)), None);
    }
}
