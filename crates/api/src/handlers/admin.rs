//! Administrative handlers.

use axum::extract::State;
use axum::Json;
use pomo_core::error::CoreError;
use pomo_core::DbId;
use pomo_db::repositories::UserRepo;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extract::ValidPath;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RevokeTokensResponse {
    pub user_id: DbId,
    pub revoked: u64,
}

/// POST /api/v1/admin/users/{id}/revoke-tokens
///
/// Sign a user out everywhere by revoking all their refresh tokens.
/// Access tokens already issued stay valid until they expire.
pub async fn revoke_user_tokens(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    ValidPath(user_id): ValidPath<DbId>,
) -> AppResult<Json<DataResponse<RevokeTokensResponse>>> {
    UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;

    let revoked = state.tokens.revoke_all(user_id).await?;
    tracing::info!(admin_id = admin.user_id, user_id, revoked, "Admin revoked user tokens");

    Ok(Json(DataResponse::new(RevokeTokensResponse { user_id, revoked })))
}
