//! Session token endpoints.
//!
//! - POST `/login` - Exchange email and password for a token pair
//! - POST `/refresh` - Exchange a refresh token for a new pair (single use)
//! - POST `/logout` - Revoke a refresh token

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::AppState;
use super::error::{ApiError, ResultExt, require};
use crate::password::verify_password;

#[derive(Deserialize)]
pub(super) struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub(super) struct RefreshRequest {
    #[serde(default)]
    refresh_token: String,
}

/// Body returned by register, login and refresh.
#[derive(Debug, Serialize)]
pub(super) struct SessionResponse {
    user_id: String,
    access_token: String,
    refresh_token: String,
}

/// Mint an access/refresh pair for `user_id` and record the refresh token.
///
/// Any failure fails the whole request; a client never receives a refresh
/// token that the store does not know about.
pub(super) async fn issue_session(
    state: &AppState,
    user_id: &str,
) -> Result<SessionResponse, ApiError> {
    let access_token = state
        .issuer
        .issue_access_token(user_id)
        .internal_err("Failed to issue access token")?;

    let refresh_token = state
        .issuer
        .issue_refresh_token(user_id)
        .internal_err("Failed to issue refresh token")?;

    state
        .refresh_tokens
        .save(&refresh_token)
        .await
        .internal_err("Failed to save refresh token")?;

    Ok(SessionResponse {
        user_id: user_id.to_string(),
        access_token,
        refresh_token,
    })
}

pub(super) async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&req.email, "email")?;
    require(&req.password, "password")?;

    let Some(user) = state
        .db
        .users()
        .get_by_email(&req.email)
        .await
        .internal_err("Failed to get user by email")?
    else {
        warn!("Login with unknown email");
        return Err(ApiError::unauthorized("invalid email or password"));
    };

    let matches = verify_password(req.password, user.password_hash.clone())
        .await
        .internal_err("Failed to compare password")?;
    if !matches {
        warn!(user_id = %user.id, "Login with invalid password");
        return Err(ApiError::unauthorized("invalid email or password"));
    }

    let session = issue_session(&state, &user.id).await?;
    Ok((StatusCode::OK, Json(session)))
}

/// Rotate a refresh token.
/// The token is consumed before it is verified, so a replayed token fails
/// even if its signature and claims are still good.
///
/// Tokens carry second-resolution timestamps and no nonce: rotating within
/// the second the token was issued yields the same string, which is saved
/// again and so stays usable.
pub(super) async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&req.refresh_token, "refresh_token")?;

    if let Err(e) = state.refresh_tokens.pop(&req.refresh_token).await {
        warn!(error = %e, "Failed to pop refresh token");
        return Err(ApiError::unauthorized("invalid refresh token"));
    }

    let user_id = state
        .verifier
        .verify_refresh(&req.refresh_token)
        .map_err(|e| {
            warn!(error = %e, "Failed to verify refresh token");
            ApiError::unauthorized("invalid refresh token")
        })?;

    let session = issue_session(&state, &user_id).await?;
    Ok((StatusCode::OK, Json(session)))
}

/// Revoke a refresh token. Always succeeds so the endpoint reveals nothing
/// about whether the token was live.
pub(super) async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> impl IntoResponse {
    if !req.refresh_token.is_empty() {
        if let Err(e) = state.refresh_tokens.pop(&req.refresh_token).await {
            warn!(error = %e, "Failed to revoke refresh token on logout");
        }
    }

    (StatusCode::OK, Json(serde_json::json!({ "success": true })))
}
