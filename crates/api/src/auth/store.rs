//! Persistence seam for refresh-token records.
//!
//! [`TokenLifecycle`](super::lifecycle::TokenLifecycle) only talks to this
//! trait. Production uses [`PgRefreshTokenStore`]; unit tests plug in an
//! in-memory store with the same conditional-update semantics.

use async_trait::async_trait;
use pomo_core::DbId;
use pomo_db::models::refresh_token::{CreateRefreshToken, RefreshToken};
use pomo_db::repositories::{RefreshTokenRepo, UserRepo};
use pomo_db::DbPool;

use super::lifecycle::Subject;
use crate::error::AppResult;

/// Storage operations the token lifecycle depends on.
///
/// Every revoking method must be conditional on the record still being
/// unrevoked; [`replace`](Self::replace) must be all-or-nothing.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Resolve a token subject to its current id and role.
    async fn find_subject(&self, user_id: DbId) -> AppResult<Option<Subject>>;

    async fn insert(&self, record: CreateRefreshToken) -> AppResult<RefreshToken>;

    /// Look up a record by hash, whatever its state.
    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<RefreshToken>>;

    /// Persist `replacement` and retire `old_id` pointing at it, atomically.
    ///
    /// Returns `None` with nothing persisted when `old_id` was no longer
    /// active.
    async fn replace(
        &self,
        old_id: DbId,
        replacement: CreateRefreshToken,
    ) -> AppResult<Option<RefreshToken>>;

    async fn revoke_by_hash(&self, token_hash: &str) -> AppResult<bool>;

    /// Revoke every unrevoked record of `user_id`, returning how many.
    async fn revoke_all_for_user(&self, user_id: DbId) -> AppResult<u64>;
}

/// PostgreSQL-backed store over [`RefreshTokenRepo`] and [`UserRepo`].
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: DbPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn find_subject(&self, user_id: DbId) -> AppResult<Option<Subject>> {
        let user = UserRepo::find_by_id(&self.pool, user_id).await?;
        Ok(user.map(|u| Subject {
            id: u.id,
            role: u.role,
        }))
    }

    async fn insert(&self, record: CreateRefreshToken) -> AppResult<RefreshToken> {
        Ok(RefreshTokenRepo::create(&self.pool, &record).await?)
    }

    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<RefreshToken>> {
        Ok(RefreshTokenRepo::find_by_hash(&self.pool, token_hash).await?)
    }

    async fn replace(
        &self,
        old_id: DbId,
        replacement: CreateRefreshToken,
    ) -> AppResult<Option<RefreshToken>> {
        Ok(RefreshTokenRepo::rotate(&self.pool, old_id, &replacement).await?)
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> AppResult<bool> {
        Ok(RefreshTokenRepo::revoke_by_hash(&self.pool, token_hash).await?)
    }

    async fn revoke_all_for_user(&self, user_id: DbId) -> AppResult<u64> {
        Ok(RefreshTokenRepo::revoke_all_for_user(&self.pool, user_id).await?)
    }
}
