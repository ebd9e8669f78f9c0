//! Vidora metadata persistence
//!
//! Repositories for media resources and user accounts, each behind a trait so
//! the API can run against PostgreSQL or the in-process memory store.

pub mod db;

pub use db::*;
