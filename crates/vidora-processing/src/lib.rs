//! Vidora background processing
//!
//! The [`ProgressTracker`] drives each uploaded resource through
//! `pending -> processing -> complete | failed`, one timed step at a time, and
//! reports every transition to a [`NotificationSink`].

pub mod classifier;
pub mod events;
pub mod tracker;

pub use classifier::{ClassificationPolicy, FixedClassifier, RandomClassifier};
pub use events::{NotificationSink, ProgressEvent};
pub use tracker::ProgressTracker;
