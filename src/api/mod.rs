mod error;
mod tokens;
mod users;

use axum::{Json, Router, response::IntoResponse, routing::post};
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::{RefreshTokenStore, RefreshTokenVerifier, TokenIssuer};

pub use error::ApiError;

/// State shared by every API handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub issuer: Arc<dyn TokenIssuer>,
    pub verifier: Arc<dyn RefreshTokenVerifier>,
    pub refresh_tokens: RefreshTokenStore,
    pub bcrypt_cost: u32,
}

/// Create the versioned API router. Authentication is applied by the caller
/// on the outer router, where full request paths are visible.
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(tokens::login))
        .route("/refresh", post(tokens::refresh))
        .route("/logout", post(tokens::logout))
        .route("/user/password", post(users::update_password))
        .with_state(state)
}

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
