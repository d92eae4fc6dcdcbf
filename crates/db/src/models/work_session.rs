//! Work-session model, DTOs and list filters.

use pomo_core::error::CoreError;
use pomo_core::{DbId, Timestamp};
use pomo_core::work_session::{SessionState, SessionStatus, SessionType};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `work_sessions` table.
///
/// `status` and `session_type` are stored as text; use [`WorkSession::state`]
/// to get the typed state machine view.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkSession {
    pub id: DbId,
    pub user_id: DbId,
    pub task_id: Option<DbId>,
    pub session_type: String,
    pub status: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub duration_minutes: Option<i32>,
    pub total_paused_seconds: i64,
    pub paused_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkSession {
    /// Typed view of the timing columns.
    pub fn state(&self) -> Result<SessionState, CoreError> {
        Ok(SessionState {
            status: self.status.parse()?,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            total_paused_seconds: self.total_paused_seconds,
            paused_at: self.paused_at,
        })
    }
}

/// DTO for inserting a new session row.
#[derive(Debug, Clone)]
pub struct CreateWorkSession {
    pub user_id: DbId,
    pub task_id: Option<DbId>,
    pub session_type: SessionType,
    pub state: SessionState,
}

/// Filters for listing sessions. `None` fields are not applied.
#[derive(Debug, Clone, Default)]
pub struct WorkSessionFilter {
    /// Restrict to one owner. Admin listings leave this unset.
    pub user_id: Option<DbId>,
    pub task_id: Option<DbId>,
    pub status: Option<SessionStatus>,
    /// Inclusive lower bound on `start_time`.
    pub from: Option<Timestamp>,
    /// Inclusive upper bound on `start_time`.
    pub to: Option<Timestamp>,
}
