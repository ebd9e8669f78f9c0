//! Authentication API integration tests.
//!
//! Run with: `cargo test -p vidora-api --test auth_test`

mod helpers;

use helpers::auth::{login, register_test_user, TEST_PASSWORD};
use helpers::setup_test_app;
use serde_json::json;

#[tokio::test]
async fn test_register_returns_user_without_token() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post("/api/auth/register")
        .json(&json!({
            "name": "Ada",
            "email": "Ada@Example.com",
            "password": "secret1",
            "role": "editor",
            "tenantId": "acme",
        }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["role"], "editor");
    assert_eq!(body["user"]["tenantId"], "acme");
    assert!(body.get("token").is_none());
    assert!(!body.to_string().contains("secret1"));
}

#[tokio::test]
async fn test_register_defaults_to_viewer() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post("/api/auth/register")
        .json(&json!({
            "name": "Bob",
            "email": "bob@example.com",
            "password": "secret1",
            "tenantId": "acme",
        }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: serde_json::Value = response.json();
    assert_eq!(body["user"]["role"], "viewer");
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(client, "viewer").await;

    let response = client
        .post("/api/auth/register")
        .json(&json!({
            "name": "Again",
            "email": user.email.to_uppercase(),
            "password": "another-password",
            "tenantId": "acme",
        }))
        .await;

    assert_eq!(response.status_code(), 409);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "USER_EXISTS");
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/auth/register")
        .json(&json!({
            "name": "Short",
            "email": "short@example.com",
            "password": "12345",
            "tenantId": "acme",
        }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_register_rejects_missing_field() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/api/auth/register")
        .json(&json!({ "email": "nofields@example.com" }))
        .await;

    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_login_returns_token() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(client, "editor").await;

    let response = client
        .post("/api/auth/login")
        .json(&json!({ "email": user.email, "password": TEST_PASSWORD }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["id"], user.user_id.to_string());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email_look_the_same() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(client, "viewer").await;

    let wrong_password = client
        .post("/api/auth/login")
        .json(&json!({ "email": user.email, "password": "not-the-password" }))
        .await;
    let unknown_email = client
        .post("/api/auth/login")
        .json(&json!({ "email": "nobody@example.com", "password": TEST_PASSWORD }))
        .await;

    assert_eq!(wrong_password.status_code(), 400);
    assert_eq!(unknown_email.status_code(), 400);
    let a: serde_json::Value = wrong_password.json();
    let b: serde_json::Value = unknown_email.json();
    assert_eq!(a["code"], "INVALID_CREDENTIALS");
    assert_eq!(a["error"], b["error"]);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/videos").await;

    assert_eq!(response.status_code(), 401);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "No token provided");
}

#[tokio::test]
async fn test_protected_route_rejects_garbage_token() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get("/api/videos")
        .add_header("Authorization", "Bearer not-a-jwt")
        .await;

    assert_eq!(response.status_code(), 401);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_token_accepted_from_query_parameter() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(client, "viewer").await;

    let response = client
        .get("/api/videos")
        .add_query_param("token", &user.token)
        .await;

    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_token_from_one_server_rejected_by_another() {
    let first = setup_test_app().await;
    let second = setup_test_app().await;
    let user = register_test_user(first.client(), "viewer").await;

    // Same secret, but the user does not exist in the second server's store
    let response = second
        .client()
        .get("/api/videos")
        .add_header("Authorization", format!("Bearer {}", user.token))
        .await;

    assert_eq!(response.status_code(), 401);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_email() {
    let app = setup_test_app().await;
    let client = app.client();
    let user = register_test_user(client, "viewer").await;

    let token = login(client, &user.email.to_uppercase(), TEST_PASSWORD).await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_event_stream_requires_token() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/videos/events").await;

    assert_eq!(response.status_code(), 401);
}
