//! Data models for the application
//!
//! `media` holds the uploaded resource and its processing lifecycle;
//! `user` holds accounts and the authenticated principal.

mod media;
mod user;

pub use media::*;
pub use user::*;
