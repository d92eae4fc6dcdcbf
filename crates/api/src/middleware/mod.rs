//! Request extractors for authentication, authorization and client metadata.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a Bearer access token.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.
//! - [`client_meta`] -- Client IP and user agent for refresh-token records.

pub mod auth;
pub mod client_meta;
pub mod rbac;
