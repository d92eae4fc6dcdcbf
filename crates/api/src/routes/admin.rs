//! Route definitions for `/admin`.

use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. All require the admin role.
///
/// ```text
/// POST /users/{id}/revoke-tokens -> revoke_user_tokens
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/users/{id}/revoke-tokens",
        post(admin::revoke_user_tokens),
    )
}
