//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::jwt::JwtError;

/// Why a request could not be authenticated.
///
/// The variants are for logs only: every one of them reaches the client as
/// the same bare 401.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("bearer token is missing")]
    TokenMissing,
    #[error(transparent)]
    InvalidToken(#[from] JwtError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "unauthorized",
            }),
        )
            .into_response()
    }
}
