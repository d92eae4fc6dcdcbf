//! Authentication primitives and the refresh-token lifecycle.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- Typed access/refresh JWTs and the keyed `jti` hash.
//! - [`lifecycle`] -- Issue, verify, rotate and revoke credential pairs.
//! - [`store`] -- Persistence seam for refresh-token records.
//! - [`cookies`] -- The HttpOnly refresh-token cookie.

pub mod cookies;
pub mod jwt;
pub mod lifecycle;
pub mod password;
pub mod store;
