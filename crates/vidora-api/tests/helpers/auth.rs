use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "TestPassword123!";

/// Registered and logged-in user.
pub struct TestUser {
    pub email: String,
    pub user_id: Uuid,
    pub token: String,
}

/// Register a user with the given role and log in; the email is made unique per call.
pub async fn register_test_user(client: &TestServer, role: &str) -> TestUser {
    let email = format!("{}-{}@example.com", role, Uuid::new_v4().simple());

    let response = client
        .post("/api/auth/register")
        .json(&json!({
            "name": format!("Test {}", role),
            "email": email,
            "password": TEST_PASSWORD,
            "role": role,
            "tenantId": "tenant-test",
        }))
        .await;
    assert_eq!(response.status_code(), 201, "register failed: {}", response.text());
    let body: serde_json::Value = response.json();
    let user_id: Uuid =
        serde_json::from_value(body["user"]["id"].clone()).expect("user id should be a uuid");

    let token = login(client, &email, TEST_PASSWORD).await;

    TestUser {
        email,
        user_id,
        token,
    }
}

pub async fn login(client: &TestServer, email: &str, password: &str) -> String {
    let response = client
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .await;
    assert_eq!(response.status_code(), 200, "login failed: {}", response.text());
    let body: serde_json::Value = response.json();
    body["token"]
        .as_str()
        .expect("login should return a token")
        .to_string()
}
