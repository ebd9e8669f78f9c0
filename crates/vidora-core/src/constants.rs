//! Domain constants shared by the tracker, the streamer and the API.

/// Mime type recorded when an upload does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "video/mp4";

/// Progress added by each tracker advancement step (five steps reach completion).
pub const PROGRESS_STEP_PERCENT: i32 = 20;

/// Progress value of a completed resource.
pub const PROGRESS_COMPLETE_PERCENT: i32 = 100;
