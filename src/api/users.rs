//! User account endpoints.
//!
//! - POST `/register` - Create an account and start a session
//! - POST `/user/password` - Change the caller's password (authenticated)

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tracing::{info, warn};

use super::AppState;
use super::error::{ApiError, ResultExt, require};
use super::tokens::issue_session;
use crate::auth::Identity;
use crate::db::{User, UserError};
use crate::password::{hash_password, verify_password};

#[derive(Deserialize)]
pub(super) struct RegisterRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub(super) struct UpdatePasswordRequest {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

pub(super) async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&req.email, "email")?;
    require(&req.password, "password")?;

    let password_hash = hash_password(req.password, state.bcrypt_cost)
        .await
        .internal_err("Failed to hash password")?;

    let user = User::new(uuid::Uuid::new_v4().to_string(), req.email, password_hash);

    match state.db.users().create(&user).await {
        Ok(()) => {}
        Err(UserError::EmailBusy) => {
            warn!("Registration with an email that is already taken");
            return Err(ApiError::bad_request("user already exists"));
        }
        Err(e) => return Err(ApiError::internal("Failed to save user", e)),
    }

    info!(user_id = %user.id, "User registered");

    let session = issue_session(&state, &user.id).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub(super) async fn update_password(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require(&req.old_password, "old_password")?;
    require(&req.new_password, "new_password")?;

    if req.old_password == req.new_password {
        return Ok((StatusCode::OK, Json(serde_json::json!({}))));
    }

    let Some(user_id) = identity.subject() else {
        warn!("Password update without an authenticated user");
        return Err(ApiError::bad_request("user id is missing"));
    };

    let user = state
        .db
        .users()
        .get_by_id(user_id)
        .await
        .internal_err("Failed to get user by id")?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let matches = verify_password(req.old_password, user.password_hash)
        .await
        .internal_err("Failed to compare passwords")?;
    if !matches {
        warn!(user_id = %user_id, "Password update with invalid old password");
        return Err(ApiError::bad_request("invalid old password"));
    }

    let password_hash = hash_password(req.new_password, state.bcrypt_cost)
        .await
        .internal_err("Failed to hash password")?;

    let updated = state
        .db
        .users()
        .update_password(user_id, &password_hash)
        .await
        .internal_err("Failed to update password")?;
    if !updated {
        return Err(ApiError::not_found("user not found"));
    }

    info!(user_id = %user_id, "Password updated");
    Ok((StatusCode::OK, Json(serde_json::json!({}))))
}
