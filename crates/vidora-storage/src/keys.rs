//! Storage key generation for uploaded files.

use uuid::Uuid;

const KEY_PREFIX: &str = "videos";
const FALLBACK_NAME: &str = "video";

/// Build a unique storage key for an upload: `videos/{millis}-{nonce}-{name}`.
///
/// Only the final path component of `original_name` is kept, whitespace
/// becomes `_`, anything outside `[A-Za-z0-9._-]` is dropped and runs of `.`
/// collapse to one.
pub fn generate_upload_key(original_name: &str, now_millis: i64) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}-{}-{}",
        KEY_PREFIX,
        now_millis,
        &nonce[..8],
        sanitize_file_name(original_name)
    )
}

fn sanitize_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let mut cleaned = String::with_capacity(base.len());
    for c in base.chars() {
        let kept = if c.is_whitespace() {
            '_'
        } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            continue;
        };
        // Runs of dots collapse to one
        if kept == '.' && cleaned.ends_with('.') {
            continue;
        }
        cleaned.push(kept);
    }

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
