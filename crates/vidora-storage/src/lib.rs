//! Vidora Storage Library
//!
//! Blob storage for uploaded videos. The [`Storage`] trait covers what the
//! upload and streaming paths need: a streamed write, the total length of a
//! stored object, and a streamed read starting at an arbitrary byte offset.
//!
//! # Storage key format
//!
//! Upload keys look like `videos/{millis}-{nonce}-{sanitized name}`. Keys must not
//! contain `..` or a leading `/`; key generation lives in the `keys` module.

pub mod factory;
pub mod keys;
pub mod local;
pub mod traits;

pub use factory::create_storage;
pub use keys::generate_upload_key;
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
