//! Handlers for the `/auth` resource (register, login, refresh, logout, me).
//!
//! The refresh token never appears in a response body; it travels in the
//! HttpOnly cookie named by `ServerConfig::refresh_cookie_name`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::CookieJar;
use pomo_core::error::CoreError;
use pomo_core::roles::ROLE_USER;
use pomo_db::models::user::{CreateUser, User, UserResponse};
use pomo_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::cookies::{clear_refresh_cookie, get_refresh_token, refresh_cookie};
use crate::auth::lifecycle::{ClientMeta, IssuedTokens, Subject};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: String,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Successful authentication response returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: IssuedTokens,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create a `user`-role account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    meta: ClientMeta,
    jar: CookieJar,
    ValidJson(input): ValidJson<RegisterRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<DataResponse<AuthResponse>>)> {
    validate_password_strength(&input.password, state.config.min_password_length)
        .map_err(|msg| CoreError::invalid_field("password", msg))?;

    let username = input.username.trim().to_string();
    let email = normalize_email(&input.email);

    if UserRepo::exists_by_email_or_username(&state.pool, &email, &username).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Email or username already in use".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username,
            email,
            password_hash,
            role: ROLE_USER.to_string(),
        },
    )
    .await?;

    tracing::info!(user_id = user.id, "User registered");

    let (jar, body) = sign_in(&state, &user, &meta, jar).await?;
    Ok((StatusCode::CREATED, jar, body))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password.
pub async fn login(
    State(state): State<AppState>,
    meta: ClientMeta,
    jar: CookieJar,
    ValidJson(input): ValidJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<DataResponse<AuthResponse>>)> {
    let invalid = || AppError::unauthorized("Invalid email or password");

    let user = UserRepo::find_by_email(&state.pool, &normalize_email(&input.email))
        .await?
        .ok_or_else(invalid)?;

    let valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {e}")))?;
    if !valid {
        tracing::info!(user_id = user.id, "Failed login attempt");
        return Err(invalid());
    }

    tracing::info!(user_id = user.id, "User logged in");
    sign_in(&state, &user, &meta, jar).await
}

/// POST /api/v1/auth/refresh
///
/// Rotate the refresh cookie into a new pair. Any authentication failure
/// also clears the cookie so the browser stops presenting it.
pub async fn refresh(
    State(state): State<AppState>,
    meta: ClientMeta,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DataResponse<IssuedTokens>>), (CookieJar, AppError)> {
    let cookie_name = state.config.refresh_cookie_name.as_str();

    let Some(token) = get_refresh_token(&jar, cookie_name) else {
        return Err((
            jar.add(clear_refresh_cookie(cookie_name, state.config.secure_cookies)),
            AppError::unauthorized("Missing refresh token"),
        ));
    };

    match state.tokens.rotate(&token, &meta).await {
        Ok((_, tokens)) => {
            let jar = jar.add(refresh_cookie(
                cookie_name,
                &tokens.refresh_token,
                state.config.jwt.refresh_token_expiry_days,
                state.config.secure_cookies,
            ));
            Ok((jar, Json(DataResponse::new(tokens))))
        }
        Err(err) if err.is_unauthorized() => {
            let jar = jar.add(clear_refresh_cookie(
                cookie_name,
                state.config.secure_cookies,
            ));
            Err((jar, err))
        }
        Err(err) => Err((jar, err)),
    }
}

/// POST /api/v1/auth/logout
///
/// Revoke the presented refresh token (if any) and clear the cookie.
/// Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<DataResponse<MessageResponse>>) {
    let cookie_name = state.config.refresh_cookie_name.as_str();
    let token = get_refresh_token(&jar, cookie_name);
    state.tokens.revoke(token.as_deref()).await;

    (
        jar.add(clear_refresh_cookie(cookie_name, state.config.secure_cookies)),
        Json(DataResponse::new(MessageResponse {
            message: "Logged out",
        })),
    )
}

/// GET /api/v1/auth/me
pub async fn me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth.user_id,
        }))?;
    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Issue a pair for `user` and attach the refresh cookie.
async fn sign_in(
    state: &AppState,
    user: &User,
    meta: &ClientMeta,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<DataResponse<AuthResponse>>)> {
    let subject = Subject {
        id: user.id,
        role: user.role.clone(),
    };
    let tokens = state.tokens.issue(&subject, meta).await?;

    let jar = jar.add(refresh_cookie(
        &state.config.refresh_cookie_name,
        &tokens.refresh_token,
        state.config.jwt.refresh_token_expiry_days,
        state.config.secure_cookies,
    ));

    Ok((
        jar,
        Json(DataResponse::new(AuthResponse {
            tokens,
            user: UserResponse::from(user),
        })),
    ))
}
