pub mod auth;
pub mod events;
pub mod misc;
pub mod video_get;
pub mod video_stream;
pub mod video_upload;
