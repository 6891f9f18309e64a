//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::AuthError;

/// Subject resolved by the auth middleware, stored in request extensions.
///
/// Empty on exempt routes reached without a valid token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity(pub String);

impl Identity {
    /// The authenticated subject, if there is one.
    pub fn subject(&self) -> Option<&str> {
        if self.0.is_empty() {
            None
        } else {
            Some(&self.0)
        }
    }
}

/// Reads the identity injected by the auth middleware.
/// Rejects with 401 on routes the middleware does not cover.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AuthError::TokenMissing)
    }
}
