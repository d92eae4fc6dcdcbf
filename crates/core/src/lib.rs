//! Domain logic for the Pomodoro tracker.
//!
//! Everything in this crate is pure: no database, no HTTP, no clock reads.
//! Callers pass `now` explicitly so transitions are deterministic under test.

pub mod error;
pub mod pagination;
pub mod roles;
pub mod work_session;

/// Row id of a user, session, task or refresh-token record (`BIGSERIAL`).
pub type DbId = i64;

/// Instants are stored as `TIMESTAMPTZ` and handled in UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
