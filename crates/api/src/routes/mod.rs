pub mod admin;
pub mod auth;
pub mod health;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                          register (public)
/// /auth/login                             login (public)
/// /auth/refresh                           rotate refresh cookie (public)
/// /auth/logout                            revoke refresh cookie (public)
/// /auth/me                                current user (requires auth)
///
/// /sessions                               list, create
/// /sessions/{id}                          get, finish (PUT), delete
/// /sessions/{id}/pause                    pause (PATCH)
/// /sessions/{id}/resume                   resume (PATCH)
///
/// /admin/users/{id}/revoke-tokens         revoke all refresh tokens (admin only)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/sessions", sessions::router())
        .nest("/admin", admin::router())
}
