//! Authentication: HS256 JWT issuance/verification, password hashing and the
//! bearer-token middleware that establishes the request [`Principal`].
//!
//! [`Principal`]: vidora_core::models::Principal

pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
