//! Repository for the `work_sessions` table.

use pomo_core::DbId;
use pomo_core::work_session::{SessionState, SessionStatus};
use sqlx::PgPool;

use crate::models::work_session::{CreateWorkSession, WorkSession, WorkSessionFilter};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, task_id, session_type, status, start_time, end_time, \
                        duration_minutes, total_paused_seconds, paused_at, created_at, updated_at";

/// Provides persistence for work sessions.
pub struct WorkSessionRepo;

impl WorkSessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateWorkSession,
    ) -> Result<WorkSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO work_sessions
                (user_id, task_id, session_type, status, start_time, end_time,
                 duration_minutes, total_paused_seconds, paused_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkSession>(&query)
            .bind(input.user_id)
            .bind(input.task_id)
            .bind(input.session_type.as_str())
            .bind(input.state.status.as_str())
            .bind(input.state.start_time)
            .bind(input.state.end_time)
            .bind(input.state.duration_minutes)
            .bind(input.state.total_paused_seconds)
            .bind(input.state.paused_at)
            .fetch_one(pool)
            .await
    }

    /// Find a session by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<WorkSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM work_sessions WHERE id = $1");
        sqlx::query_as::<_, WorkSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List sessions matching `filter`, most recently started first.
    pub async fn list(
        pool: &PgPool,
        filter: &WorkSessionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WorkSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM work_sessions
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
               AND ($2::BIGINT IS NULL OR task_id = $2)
               AND ($3::TEXT IS NULL OR status = $3)
               AND ($4::TIMESTAMPTZ IS NULL OR start_time >= $4)
               AND ($5::TIMESTAMPTZ IS NULL OR start_time <= $5)
             ORDER BY start_time DESC, id DESC
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, WorkSession>(&query)
            .bind(filter.user_id)
            .bind(filter.task_id)
            .bind(filter.status.map(SessionStatus::as_str))
            .bind(filter.from)
            .bind(filter.to)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Persist `next`, computed from the row as it was read (`current`).
    ///
    /// The update only applies while the stored status and pause bookkeeping
    /// still equal `current`. A row that went `running -> paused -> running`
    /// in between no longer matches. Returns `None` when another request
    /// moved it first.
    pub async fn apply_transition(
        pool: &PgPool,
        id: DbId,
        current: &SessionState,
        next: &SessionState,
    ) -> Result<Option<WorkSession>, sqlx::Error> {
        let query = format!(
            "UPDATE work_sessions SET
                status = $5,
                end_time = $6,
                duration_minutes = $7,
                total_paused_seconds = $8,
                paused_at = $9
             WHERE id = $1
               AND status = $2
               AND total_paused_seconds = $3
               AND paused_at IS NOT DISTINCT FROM $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkSession>(&query)
            .bind(id)
            .bind(current.status.as_str())
            .bind(current.total_paused_seconds)
            .bind(current.paused_at)
            .bind(next.status.as_str())
            .bind(next.end_time)
            .bind(next.duration_minutes)
            .bind(next.total_paused_seconds)
            .bind(next.paused_at)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a session. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM work_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
