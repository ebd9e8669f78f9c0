use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use uuid::Uuid;

/// Deterministic pseudo-video payload; byte `i` is `i % 251`.
pub fn video_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

pub fn upload_form(title: Option<&str>, video: Option<Vec<u8>>) -> MultipartForm {
    let mut form = MultipartForm::new();
    if let Some(title) = title {
        form = form.add_text("title", title.to_string());
    }
    if let Some(bytes) = video {
        form = form.add_part(
            "video",
            Part::bytes(bytes)
                .file_name("clip.mp4")
                .mime_type("video/mp4"),
        );
    }
    form
}

/// Upload a video and return its id, asserting the 201 response.
pub async fn upload_video(client: &TestServer, token: &str, title: &str, bytes: Vec<u8>) -> Uuid {
    let response = client
        .post("/api/videos/upload")
        .add_header("Authorization", format!("Bearer {}", token))
        .multipart(upload_form(Some(title), Some(bytes)))
        .await;
    assert_eq!(response.status_code(), 201, "upload failed: {}", response.text());

    let body: serde_json::Value = response.json();
    serde_json::from_value(body["data"]["video"]["id"].clone()).expect("video id should be a uuid")
}
