//! Route definitions for the `/sessions` resource.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// Routes mounted at `/sessions`. All require auth.
///
/// ```text
/// GET    /              -> list
/// POST   /              -> create
/// GET    /{id}          -> get_by_id
/// PUT    /{id}          -> finish
/// DELETE /{id}          -> delete
/// PATCH  /{id}/pause    -> pause
/// PATCH  /{id}/resume   -> resume
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sessions::list).post(sessions::create))
        .route(
            "/{id}",
            get(sessions::get_by_id)
                .put(sessions::finish)
                .delete(sessions::delete),
        )
        .route("/{id}/pause", patch(sessions::pause))
        .route("/{id}/resume", patch(sessions::resume))
}
