//! Database repositories for data access layer
//!
//! `media` owns the resource lifecycle writes used by the progress tracker,
//! `user` owns accounts. Both have a PostgreSQL and an in-memory implementation.

pub mod factory;
pub mod media;
pub mod memory;
pub mod user;

pub use factory::{create_stores, Stores};
pub use media::{MediaStore, PgMediaStore};
pub use memory::{InMemoryMediaStore, InMemoryUserStore};
pub use user::{PgUserStore, UserStore};
