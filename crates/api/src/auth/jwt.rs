//! Access and refresh JWTs.
//!
//! Both token kinds are HS256-signed, but with different secrets and
//! different lifetimes, and each carries a `token_type` tag that is checked
//! on decode. A refresh token can therefore never pass as an access token
//! (and vice versa) even if the two secrets were ever configured equal.
//!
//! Only refresh tokens carry a `jti`. The server stores a keyed
//! HMAC-SHA256 of the `jti`, never the token, so a database leak cannot be
//! replayed.

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use pomo_core::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Which of the two credential kinds a JWT claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    /// The user's role name (e.g. `"admin"`, `"user"`).
    pub role: String,
    pub token_type: TokenType,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
}

/// Claims embedded in every refresh token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: DbId,
    pub role: String,
    /// Unique token identifier (UUID v4); its keyed hash is the lookup key
    /// of the server-side record.
    pub jti: String,
    pub token_type: TokenType,
    pub exp: i64,
    pub iat: i64,
}

/// Why a presented token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Expected a {expected:?} token, got {found:?}")]
    WrongType { expected: TokenType, found: TokenType },

    #[error("Could not key the token hash")]
    HashKey,
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify access tokens.
    pub access_secret: String,
    /// HMAC-SHA256 secret used to sign and verify refresh tokens. Also keys
    /// the stored `jti` hash.
    pub refresh_secret: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;
/// Shortest secret accepted for either signing key.
const MIN_SECRET_LEN: usize = 16;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_ACCESS_SECRET`        | **yes**  | --      |
    /// | `JWT_REFRESH_SECRET`       | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if either secret is missing, shorter than 16 characters, or if
    /// both secrets are identical.
    pub fn from_env() -> Self {
        let access_secret = std::env::var("JWT_ACCESS_SECRET")
            .expect("JWT_ACCESS_SECRET must be set in the environment");
        let refresh_secret = std::env::var("JWT_REFRESH_SECRET")
            .expect("JWT_REFRESH_SECRET must be set in the environment");
        assert!(
            access_secret.len() >= MIN_SECRET_LEN,
            "JWT_ACCESS_SECRET must be at least {MIN_SECRET_LEN} characters"
        );
        assert!(
            refresh_secret.len() >= MIN_SECRET_LEN,
            "JWT_REFRESH_SECRET must be at least {MIN_SECRET_LEN} characters"
        );
        assert_ne!(
            access_secret, refresh_secret,
            "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ"
        );

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        Self {
            access_secret,
            refresh_secret,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }

    /// Access token lifetime in seconds, as reported to clients.
    pub fn access_expires_in_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }
}

/// Generate an access token for the given user.
pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = AccessClaims {
        sub: user_id,
        role: role.to_string(),
        token_type: TokenType::Access,
        exp: now + config.access_token_expiry_mins * 60,
        iat: now,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.access_secret.as_bytes()),
    )
}

/// Generate a refresh token carrying `jti`.
///
/// Returns the encoded token and its expiry instant.
pub fn generate_refresh_token(
    user_id: DbId,
    role: &str,
    jti: &str,
    config: &JwtConfig,
) -> Result<(String, Timestamp), jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expires_at = now + Duration::days(config.refresh_token_expiry_days);
    let claims = RefreshClaims {
        sub: user_id,
        role: role.to_string(),
        jti: jti.to_string(),
        token_type: TokenType::Refresh,
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.refresh_secret.as_bytes()),
    )?;
    Ok((token, expires_at))
}

/// Validate an access token: signature, expiry, and the `access` type tag.
pub fn validate_access_token(token: &str, config: &JwtConfig) -> Result<AccessClaims, TokenError> {
    let claims = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(config.access_secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?
    .claims;
    expect_type(TokenType::Access, claims.token_type)?;
    Ok(claims)
}

/// Validate a refresh token: signature, expiry, and the `refresh` type tag.
pub fn validate_refresh_token(
    token: &str,
    config: &JwtConfig,
) -> Result<RefreshClaims, TokenError> {
    let claims = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.refresh_secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;
    expect_type(TokenType::Refresh, claims.token_type)?;
    Ok(claims)
}

fn expect_type(expected: TokenType, found: TokenType) -> Result<(), TokenError> {
    if expected == found {
        Ok(())
    } else {
        Err(TokenError::WrongType { expected, found })
    }
}

/// Keyed hex digest of a refresh token's `jti`, as stored server-side.
pub fn hash_token_id(jti: &str, config: &JwtConfig) -> Result<String, TokenError> {
    let mut mac = HmacSha256::new_from_slice(config.refresh_secret.as_bytes())
        .map_err(|_| TokenError::HashKey)?;
    mac.update(jti.as_bytes());
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}
