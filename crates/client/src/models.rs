//! Response payloads, as found under `data` in the success envelope.

use chrono::{DateTime, Utc};
use pomo_core::work_session::{FinishOutcome, SessionStatus, SessionType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
}

/// Returned by register and login.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub access_expires_in: i64,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: User,
}

/// Returned by refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_in: i64,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkSession {
    pub id: i64,
    pub user_id: i64,
    pub task_id: Option<i64>,
    pub session_type: SessionType,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub total_paused_seconds: i64,
    pub paused_at: Option<DateTime<Utc>>,
    pub elapsed_active_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSession {
    pub session_type: SessionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishSession {
    pub status: FinishOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i32>,
}
