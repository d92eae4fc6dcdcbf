use std::sync::Arc;

use crate::auth::lifecycle::TokenLifecycle;
use crate::auth::store::PgRefreshTokenStore;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: pomo_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Refresh-token lifecycle over the database store.
    pub tokens: Arc<TokenLifecycle>,
}

impl AppState {
    pub fn new(pool: pomo_db::DbPool, config: ServerConfig) -> Self {
        let store = Arc::new(PgRefreshTokenStore::new(pool.clone()));
        let tokens = Arc::new(TokenLifecycle::new(config.jwt.clone(), store));
        Self {
            pool,
            config: Arc::new(config),
            tokens,
        }
    }
}
