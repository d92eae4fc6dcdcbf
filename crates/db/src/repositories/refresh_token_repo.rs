//! Repository for the `refresh_tokens` table.
//!
//! Every revocation is a conditional update (`revoked_at IS NULL`), so a
//! revoked record can never be revived and two racing writers cannot both
//! retire the same record.

use pomo_core::DbId;
use sqlx::PgPool;

use crate::models::refresh_token::{CreateRefreshToken, RefreshToken};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token_hash, expires_at, revoked_at, replaced_by_id, \
                        created_by_ip, user_agent, created_at";

/// Provides persistence for refresh-token records.
pub struct RefreshTokenRepo;

impl RefreshTokenRepo {
    /// Insert a new record, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateRefreshToken,
    ) -> Result<RefreshToken, sqlx::Error> {
        let query = format!(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_by_ip, user_agent)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(input.user_id)
            .bind(&input.token_hash)
            .bind(input.expires_at)
            .bind(&input.created_by_ip)
            .bind(&input.user_agent)
            .fetch_one(pool)
            .await
    }

    /// Find a record by its hash regardless of state.
    ///
    /// Revoked and expired rows are returned too: the caller needs to see
    /// them to tell a replayed token from an unknown one.
    pub async fn find_by_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM refresh_tokens WHERE token_hash = $1");
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Insert `replacement` and retire `old_id` in one transaction.
    ///
    /// The old record is revoked only if it is still active, with
    /// `replaced_by_id` pointing at the new row. Returns `None` (and
    /// persists nothing) when the old record was no longer active, which
    /// means another rotation already consumed it.
    pub async fn rotate(
        pool: &PgPool,
        old_id: DbId,
        replacement: &CreateRefreshToken,
    ) -> Result<Option<RefreshToken>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_query = format!(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_by_ip, user_agent)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, RefreshToken>(&insert_query)
            .bind(replacement.user_id)
            .bind(&replacement.token_hash)
            .bind(replacement.expires_at)
            .bind(&replacement.created_by_ip)
            .bind(&replacement.user_agent)
            .fetch_one(&mut *tx)
            .await?;

        let result = sqlx::query(
            "UPDATE refresh_tokens
             SET revoked_at = NOW(), replaced_by_id = $2
             WHERE id = $1 AND revoked_at IS NULL AND expires_at > NOW()",
        )
        .bind(old_id)
        .bind(created.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            tracing::debug!(old_id, "Refresh token already retired, rotation rolled back");
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(created))
    }

    /// Revoke the record with the given hash. Returns `true` if a row changed.
    pub async fn revoke_by_hash(pool: &PgPool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW()
             WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every unrevoked record of a user. Returns the count revoked.
    pub async fn revoke_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW()
             WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
