//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts

pub mod refresh_token;
pub mod task;
pub mod user;
pub mod work_session;
