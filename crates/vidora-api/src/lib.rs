//! Vidora API Library
//!
//! HTTP handlers, authentication, the range streamer and application setup.

mod api_doc;
mod handlers;
mod middleware;
mod telemetry;

pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use services::events::EventBus;
pub use services::streamer::{ByteRange, RangeStreamer};
pub use state::AppState;
