//! Task model. Sessions may point at a task; tasks are otherwise managed
//! outside this service.

use pomo_core::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Task {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

pub struct CreateTask {
    pub user_id: DbId,
    pub title: String,
}
