use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use super::authenticator::Authenticator;
use super::extractors::Identity;

/// Middleware that authenticates every request before it reaches a handler.
///
/// Failures short-circuit with a 401. Otherwise the resolved [`Identity`]
/// (empty on unauthenticated exempt routes) is attached to the request.
pub async fn require_auth(
    State(authenticator): State<Arc<Authenticator>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticator.authenticate(&request) {
        Ok(subject) => {
            request.extensions_mut().insert(Identity(subject));
            next.run(request).await
        }
        Err(e) => {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                error = %e,
                "user is not authenticated"
            );
            e.into_response()
        }
    }
}
