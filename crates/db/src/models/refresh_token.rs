//! Refresh-token record model and DTOs.

use pomo_core::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `refresh_tokens` table.
///
/// `token_hash` is the keyed hash of the token's `jti`, never the token itself.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: DbId,
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    pub replaced_by_id: Option<DbId>,
    pub created_by_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

impl RefreshToken {
    /// Not revoked and not yet expired at `now`.
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

/// DTO for persisting a newly issued refresh token.
#[derive(Debug, Clone)]
pub struct CreateRefreshToken {
    pub user_id: DbId,
    pub token_hash: String,
    pub expires_at: Timestamp,
    pub created_by_ip: Option<String>,
    pub user_agent: Option<String>,
}
