//! Bearer token parsing for authentication.

use axum::http::{HeaderMap, header};

/// Authorization scheme prefix, including the separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Extract the bearer token from the Authorization header.
///
/// Returns `None` when the header is absent, not valid UTF-8, uses another
/// scheme, or carries only whitespace after the scheme.
pub fn get_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
