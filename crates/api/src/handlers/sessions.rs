//! Handlers for the `/sessions` resource.
//!
//! Every transition reads the row, applies the state machine from
//! `pomo_core::work_session` in memory, and writes back conditionally on
//! the status and pause bookkeeping it read. A concurrent writer therefore surfaces as
//! `invalid_state` rather than a lost update.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use pomo_core::error::CoreError;
use pomo_core::pagination::{clamp_limit, clamp_offset};
use pomo_core::roles::{ensure_owner_or_admin, is_admin};
use pomo_core::{DbId, Timestamp};
use pomo_core::work_session::{FinishOutcome, SessionState, SessionStatus, SessionType};
use pomo_db::models::work_session::{CreateWorkSession, WorkSession, WorkSessionFilter};
use pomo_db::repositories::{TaskRepo, WorkSessionRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{ValidJson, ValidPath, ValidQuery};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /sessions`.
#[derive(Debug, Deserialize, Validate)]
pub struct ListSessionsQuery {
    pub task_id: Option<DbId>,
    pub status: Option<SessionStatus>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<i64>,
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: Option<i64>,
}

/// Request body for `POST /sessions`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSessionRequest {
    pub session_type: SessionType,
    pub task_id: Option<DbId>,
    /// Planned length in minutes.
    #[validate(range(min = 1, max = 1440, message = "duration must be 1-1440 minutes"))]
    pub duration: Option<i32>,
}

/// Request body for `PUT /sessions/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct FinishSessionRequest {
    pub status: FinishOutcome,
    pub end_time: Option<Timestamp>,
    /// Actual length in minutes; derived from the timestamps when absent.
    #[validate(range(min = 0, max = 1440, message = "duration must be 0-1440 minutes"))]
    pub duration: Option<i32>,
}

/// A session row plus its live active time.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub session: WorkSession,
    pub elapsed_active_seconds: i64,
}

impl SessionResponse {
    fn at(session: WorkSession, now: Timestamp) -> AppResult<Self> {
        let elapsed_active_seconds = session.state()?.elapsed_active_seconds(now);
        Ok(Self {
            session,
            elapsed_active_seconds,
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/sessions
///
/// Own sessions, newest first. Admins see everyone's.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidQuery(params): ValidQuery<ListSessionsQuery>,
) -> AppResult<Json<DataResponse<Vec<SessionResponse>>>> {
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(CoreError::invalid_field("from", "from must not be after to").into());
        }
    }

    let filter = WorkSessionFilter {
        user_id: (!is_admin(&auth.role)).then_some(auth.user_id),
        task_id: params.task_id,
        status: params.status,
        from: params.from,
        to: params.to,
    };
    let rows = WorkSessionRepo::list(
        &state.pool,
        &filter,
        clamp_limit(params.limit),
        clamp_offset(params.offset),
    )
    .await?;

    let now = Utc::now();
    let data = rows
        .into_iter()
        .map(|s| SessionResponse::at(s, now))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(DataResponse::new(data)))
}

/// POST /api/v1/sessions
///
/// Start a new session, running from now.
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SessionResponse>>)> {
    if let Some(task_id) = input.task_id {
        let task = TaskRepo::find_by_id(&state.pool, task_id)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Task",
                id: task_id,
            }))?;
        ensure_owner_or_admin(auth.user_id, &auth.role, task.user_id)?;
    }

    let now = Utc::now();
    let session = WorkSessionRepo::create(
        &state.pool,
        &CreateWorkSession {
            user_id: auth.user_id,
            task_id: input.task_id,
            session_type: input.session_type,
            state: SessionState::start(now, input.duration),
        },
    )
    .await?;

    tracing::info!(
        session_id = session.id,
        user_id = auth.user_id,
        session_type = %input.session_type,
        "Work session started"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(SessionResponse::at(session, now)?)),
    ))
}

/// GET /api/v1/sessions/{id}
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<DbId>,
) -> AppResult<Json<DataResponse<SessionResponse>>> {
    let session = load_owned(&state, &auth, id).await?;
    Ok(Json(DataResponse::new(SessionResponse::at(
        session,
        Utc::now(),
    )?)))
}

/// PUT /api/v1/sessions/{id}
///
/// Finish a running or paused session as `completed` or `interrupted`.
pub async fn finish(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<DbId>,
    ValidJson(input): ValidJson<FinishSessionRequest>,
) -> AppResult<Json<DataResponse<SessionResponse>>> {
    let session = transition(&state, &auth, id, |s, now| {
        s.finish(input.status, input.end_time, input.duration, now)
    })
    .await?;

    tracing::info!(
        session_id = id,
        status = %session.status,
        duration_minutes = ?session.duration_minutes,
        "Work session finished"
    );
    respond(session)
}

/// PATCH /api/v1/sessions/{id}/pause
pub async fn pause(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<DbId>,
) -> AppResult<Json<DataResponse<SessionResponse>>> {
    let session = transition(&state, &auth, id, |s, now| s.pause(now)).await?;
    tracing::debug!(session_id = id, "Work session paused");
    respond(session)
}

/// PATCH /api/v1/sessions/{id}/resume
pub async fn resume(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<DbId>,
) -> AppResult<Json<DataResponse<SessionResponse>>> {
    let session = transition(&state, &auth, id, |s, now| s.resume(now).map(|_| ())).await?;
    tracing::debug!(
        session_id = id,
        total_paused_seconds = session.total_paused_seconds,
        "Work session resumed"
    );
    respond(session)
}

/// DELETE /api/v1/sessions/{id}
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<DbId>,
) -> AppResult<StatusCode> {
    load_owned(&state, &auth, id).await?;
    if !WorkSessionRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(session_id = id, user_id = auth.user_id, "Work session deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "WorkSession",
        id,
    })
}

fn respond(session: WorkSession) -> AppResult<Json<DataResponse<SessionResponse>>> {
    Ok(Json(DataResponse::new(SessionResponse::at(
        session,
        Utc::now(),
    )?)))
}

/// Fetch a session the caller may act on.
async fn load_owned(state: &AppState, auth: &AuthUser, id: DbId) -> AppResult<WorkSession> {
    let session = WorkSessionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    ensure_owner_or_admin(auth.user_id, &auth.role, session.user_id)?;
    Ok(session)
}

/// Run `apply` against the stored state and persist the result, provided
/// the row is still exactly as it was read.
async fn transition<F>(
    state: &AppState,
    auth: &AuthUser,
    id: DbId,
    apply: F,
) -> AppResult<WorkSession>
where
    F: FnOnce(&mut SessionState, Timestamp) -> Result<(), CoreError>,
{
    let session = load_owned(state, auth, id).await?;
    let current = session.state()?;
    let mut next = current.clone();
    apply(&mut next, Utc::now())?;

    WorkSessionRepo::apply_transition(&state.pool, id, &current, &next)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::InvalidState(
                "Session was modified by another request".into(),
            ))
        })
}
