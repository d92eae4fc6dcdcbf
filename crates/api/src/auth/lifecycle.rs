//! Refresh-token lifecycle: issue, verify, rotate, revoke.
//!
//! Every refresh token maps to exactly one stored record keyed by the hash
//! of its `jti`. A record is consumed by a successful rotation, which points
//! it at its replacement. Presenting a token whose record is missing,
//! retired, expired, or owned by someone else is treated as theft: every
//! active record of the token's subject is revoked and the call fails.

use std::sync::Arc;

use chrono::Utc;
use pomo_core::error::CoreError;
use pomo_core::{DbId, Timestamp};
use pomo_db::models::refresh_token::CreateRefreshToken;
use serde::Serialize;
use uuid::Uuid;

use super::jwt::{self, JwtConfig};
use super::store::RefreshTokenStore;
use crate::error::{AppError, AppResult};

/// The authenticated principal behind a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: DbId,
    pub role: String,
}

/// Request metadata recorded alongside each refresh-token record.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// A freshly minted credential pair.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedTokens {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub access_expires_in: i64,
    /// Delivered to browsers via cookie only; never serialized.
    #[serde(skip)]
    pub refresh_token: String,
    pub refresh_expires_at: Timestamp,
}

/// Issues and retires credential pairs against a [`RefreshTokenStore`].
pub struct TokenLifecycle {
    config: JwtConfig,
    store: Arc<dyn RefreshTokenStore>,
}

impl TokenLifecycle {
    pub fn new(config: JwtConfig, store: Arc<dyn RefreshTokenStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Mint a new pair for `subject` and persist its refresh record.
    pub async fn issue(&self, subject: &Subject, meta: &ClientMeta) -> AppResult<IssuedTokens> {
        let (tokens, record) = self.mint(subject, meta)?;
        self.store.insert(record).await?;
        tracing::debug!(user_id = subject.id, "Issued token pair");
        Ok(tokens)
    }

    /// Check an access token's signature, expiry and type tag.
    pub fn verify_access(&self, token: &str) -> Result<Subject, CoreError> {
        let claims = jwt::validate_access_token(token, &self.config).map_err(|e| {
            tracing::debug!(error = %e, "Access token rejected");
            CoreError::Unauthorized("Invalid or expired token".into())
        })?;
        Ok(Subject {
            id: claims.sub,
            role: claims.role,
        })
    }

    /// Exchange a refresh token for a new pair, retiring the old record.
    ///
    /// At most one of several concurrent rotations of the same token can
    /// succeed; the losers are handled as reuse.
    pub async fn rotate(
        &self,
        refresh_token: &str,
        meta: &ClientMeta,
    ) -> AppResult<(Subject, IssuedTokens)> {
        let claims = jwt::validate_refresh_token(refresh_token, &self.config).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token rejected");
            AppError::unauthorized("Invalid or expired refresh token")
        })?;
        let token_hash = self.hash(&claims.jti)?;

        let Some(record) = self.store.find_by_hash(&token_hash).await? else {
            return Err(self.contain_breach(claims.sub, "unknown refresh token").await);
        };
        if record.user_id != claims.sub {
            return Err(self.contain_breach(claims.sub, "refresh token owner mismatch").await);
        }
        if record.revoked_at.is_some() {
            return Err(self.contain_breach(claims.sub, "refresh token reuse").await);
        }
        if record.expires_at <= Utc::now() {
            return Err(self.contain_breach(claims.sub, "expired refresh record").await);
        }
        let Some(subject) = self.store.find_subject(claims.sub).await? else {
            return Err(self.contain_breach(claims.sub, "refresh token for deleted user").await);
        };

        let (tokens, replacement) = self.mint(&subject, meta)?;
        match self.store.replace(record.id, replacement).await? {
            Some(created) => {
                tracing::debug!(
                    user_id = subject.id,
                    old_id = record.id,
                    new_id = created.id,
                    "Rotated refresh token"
                );
                Ok((subject, tokens))
            }
            None => Err(self.contain_breach(subject.id, "concurrent refresh token reuse").await),
        }
    }

    /// Retire the record behind `refresh_token`, if there is one.
    ///
    /// Never fails: malformed, unknown, and already revoked tokens are
    /// ignored, and store errors are only logged.
    pub async fn revoke(&self, refresh_token: Option<&str>) {
        let Some(token) = refresh_token else {
            return;
        };
        let Ok(claims) = jwt::validate_refresh_token(token, &self.config) else {
            return;
        };
        let Ok(token_hash) = self.hash(&claims.jti) else {
            return;
        };
        match self.store.revoke_by_hash(&token_hash).await {
            Ok(true) => tracing::debug!(user_id = claims.sub, "Revoked refresh token"),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "Failed to revoke refresh token"),
        }
    }

    /// Revoke every active refresh record of a user.
    pub async fn revoke_all(&self, user_id: DbId) -> AppResult<u64> {
        let revoked = self.store.revoke_all_for_user(user_id).await?;
        tracing::info!(user_id, revoked, "Revoked all refresh tokens");
        Ok(revoked)
    }

    fn mint(
        &self,
        subject: &Subject,
        meta: &ClientMeta,
    ) -> AppResult<(IssuedTokens, CreateRefreshToken)> {
        let jti = Uuid::new_v4().to_string();
        let access_token = jwt::generate_access_token(subject.id, &subject.role, &self.config)
            .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;
        let (refresh_token, refresh_expires_at) =
            jwt::generate_refresh_token(subject.id, &subject.role, &jti, &self.config)
                .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

        let record = CreateRefreshToken {
            user_id: subject.id,
            token_hash: self.hash(&jti)?,
            expires_at: refresh_expires_at,
            created_by_ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
        };
        let tokens = IssuedTokens {
            access_token,
            access_expires_in: self.config.access_expires_in_secs(),
            refresh_token,
            refresh_expires_at,
        };
        Ok((tokens, record))
    }

    fn hash(&self, jti: &str) -> AppResult<String> {
        jwt::hash_token_id(jti, &self.config).map_err(|e| AppError::InternalError(e.to_string()))
    }

    /// Revoke everything the subject holds and produce the 401 to return.
    async fn contain_breach(&self, user_id: DbId, reason: &'static str) -> AppError {
        match self.store.revoke_all_for_user(user_id).await {
            Ok(revoked) => {
                tracing::warn!(user_id, revoked, reason, "Refresh token rejected, sessions revoked")
            }
            Err(e) => tracing::error!(
                user_id,
                reason,
                error = %e,
                "Refresh token rejected but mass revocation failed"
            ),
        }
        AppError::unauthorized("Invalid or expired refresh token")
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::Duration;
    use pomo_db::models::refresh_token::RefreshToken;

    use super::*;
    use crate::auth::store::memory::MemoryStore;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret-that-is-long-enough".to_string(),
            refresh_secret: "refresh-secret-that-is-long-enough".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn alice() -> Subject {
        Subject {
            id: 1,
            role: "user".to_string(),
        }
    }

    fn lifecycle_with(store: Arc<MemoryStore>) -> TokenLifecycle {
        TokenLifecycle::new(test_config(), store)
    }

    fn meta() -> ClientMeta {
        ClientMeta {
            ip: Some("10.0.0.1".into()),
            user_agent: Some("tests".into()),
        }
    }

    #[tokio::test]
    async fn issue_persists_one_hashed_record() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store.clone());

        let tokens = lifecycle.issue(&alice(), &meta()).await.unwrap();

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, 1);
        assert_eq!(records[0].created_by_ip.as_deref(), Some("10.0.0.1"));
        assert!(!records[0].token_hash.contains(&tokens.refresh_token));
        assert_eq!(tokens.access_expires_in, 900);
        assert_eq!(records[0].expires_at, tokens.refresh_expires_at);
    }

    #[tokio::test]
    async fn access_token_verifies_and_refresh_token_does_not() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store);
        let tokens = lifecycle.issue(&alice(), &meta()).await.unwrap();

        assert_eq!(lifecycle.verify_access(&tokens.access_token).unwrap(), alice());
        assert_matches!(
            lifecycle.verify_access(&tokens.refresh_token),
            Err(CoreError::Unauthorized(_))
        );
        assert_matches!(
            lifecycle.verify_access("garbage"),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[tokio::test]
    async fn rotate_retires_old_record_and_links_replacement() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store.clone());
        let first = lifecycle.issue(&alice(), &meta()).await.unwrap();

        let (subject, second) = lifecycle.rotate(&first.refresh_token, &meta()).await.unwrap();

        assert_eq!(subject, alice());
        assert_ne!(first.refresh_token, second.refresh_token);
        let records = store.records();
        assert_eq!(records.len(), 2);
        assert!(records[0].revoked_at.is_some());
        assert_eq!(records[0].replaced_by_id, Some(records[1].id));
        assert_eq!(store.active_count(1), 1);
    }

    #[tokio::test]
    async fn replayed_token_revokes_every_active_record() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store.clone());
        let first = lifecycle.issue(&alice(), &meta()).await.unwrap();
        // A second device stays logged in.
        lifecycle.issue(&alice(), &meta()).await.unwrap();

        let (_, second) = lifecycle.rotate(&first.refresh_token, &meta()).await.unwrap();
        assert_eq!(store.active_count(1), 2);

        let replay = lifecycle.rotate(&first.refresh_token, &meta()).await;
        assert!(replay.unwrap_err().is_unauthorized());
        assert_eq!(store.active_count(1), 0);

        // The legitimately rotated token was caught in the sweep too.
        let after = lifecycle.rotate(&second.refresh_token, &meta()).await;
        assert!(after.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn expired_record_is_rejected_and_contained() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store.clone());
        let first = lifecycle.issue(&alice(), &meta()).await.unwrap();
        let id = store.records()[0].id;
        store.set_expires_at(id, Utc::now() - Duration::minutes(1));

        let err = lifecycle.rotate(&first.refresh_token, &meta()).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(store.records()[0].revoked_at.is_some());
    }

    #[tokio::test]
    async fn deleted_user_cannot_rotate() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store.clone());
        let first = lifecycle.issue(&alice(), &meta()).await.unwrap();
        store.remove_subject(1);

        let err = lifecycle.rotate(&first.refresh_token, &meta()).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(store.active_count(1), 0);
    }

    #[tokio::test]
    async fn record_owned_by_another_user_is_rejected() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store.clone());
        let first = lifecycle.issue(&alice(), &meta()).await.unwrap();

        // Forge a token for user 2 that reuses alice's jti.
        let claims = jwt::validate_refresh_token(&first.refresh_token, &test_config()).unwrap();
        let (forged, _) =
            jwt::generate_refresh_token(2, "user", &claims.jti, &test_config()).unwrap();

        let err = lifecycle.rotate(&forged, &meta()).await.unwrap_err();
        assert!(err.is_unauthorized());
        // Containment targets the presented subject, not the record owner.
        assert_eq!(store.active_count(1), 1);
    }

    #[tokio::test]
    async fn concurrent_rotations_have_exactly_one_winner() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store.clone());
        let first = lifecycle.issue(&alice(), &meta()).await.unwrap();

        let (meta_a, meta_b) = (meta(), meta());
        let (a, b) = tokio::join!(
            lifecycle.rotate(&first.refresh_token, &meta_a),
            lifecycle.rotate(&first.refresh_token, &meta_b),
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    }

    /// Store whose old record is consumed by someone else right before the
    /// conditional replace runs.
    struct RacedStore(MemoryStore);

    #[async_trait]
    impl RefreshTokenStore for RacedStore {
        async fn find_subject(&self, user_id: DbId) -> AppResult<Option<Subject>> {
            self.0.find_subject(user_id).await
        }

        async fn insert(&self, record: CreateRefreshToken) -> AppResult<RefreshToken> {
            self.0.insert(record).await
        }

        async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<RefreshToken>> {
            self.0.find_by_hash(token_hash).await
        }

        async fn replace(
            &self,
            old_id: DbId,
            replacement: CreateRefreshToken,
        ) -> AppResult<Option<RefreshToken>> {
            let winner = CreateRefreshToken {
                token_hash: format!("winner-{old_id}"),
                ..replacement.clone()
            };
            self.0.replace(old_id, winner).await?;
            self.0.replace(old_id, replacement).await
        }

        async fn revoke_by_hash(&self, token_hash: &str) -> AppResult<bool> {
            self.0.revoke_by_hash(token_hash).await
        }

        async fn revoke_all_for_user(&self, user_id: DbId) -> AppResult<u64> {
            self.0.revoke_all_for_user(user_id).await
        }
    }

    #[tokio::test]
    async fn losing_a_rotation_race_is_treated_as_reuse() {
        let store = Arc::new(RacedStore(MemoryStore::with_subject(alice())));
        let lifecycle = TokenLifecycle::new(test_config(), store.clone());
        let first = lifecycle.issue(&alice(), &meta()).await.unwrap();

        let err = lifecycle.rotate(&first.refresh_token, &meta()).await.unwrap_err();

        assert!(err.is_unauthorized());
        // Only the original and the winner's record exist, both revoked.
        assert_eq!(store.0.records().len(), 2);
        assert_eq!(store.0.active_count(1), 0);
    }

    #[tokio::test]
    async fn revoke_ignores_garbage_and_is_idempotent() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store.clone());
        let tokens = lifecycle.issue(&alice(), &meta()).await.unwrap();

        lifecycle.revoke(None).await;
        lifecycle.revoke(Some("not-a-jwt")).await;
        lifecycle.revoke(Some(&tokens.access_token)).await;
        assert_eq!(store.active_count(1), 1);

        lifecycle.revoke(Some(&tokens.refresh_token)).await;
        lifecycle.revoke(Some(&tokens.refresh_token)).await;
        assert_eq!(store.active_count(1), 0);
    }

    #[tokio::test]
    async fn revoke_all_reports_count() {
        let store = Arc::new(MemoryStore::with_subject(alice()));
        let lifecycle = lifecycle_with(store.clone());
        lifecycle.issue(&alice(), &meta()).await.unwrap();
        lifecycle.issue(&alice(), &meta()).await.unwrap();

        assert_eq!(lifecycle.revoke_all(1).await.unwrap(), 2);
        assert_eq!(lifecycle.revoke_all(1).await.unwrap(), 0);
    }
}
