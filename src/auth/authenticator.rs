use axum::http::{Method, Request};
use std::collections::HashSet;
use std::sync::Arc;

use super::bearer::get_bearer_token;
use super::errors::AuthError;
use crate::jwt::AccessTokenVerifier;

/// Decides who, if anyone, a request is authenticated as.
pub struct Authenticator {
    verifier: Arc<dyn AccessTokenVerifier>,
    exempt_routes: HashSet<String>,
}

impl Authenticator {
    /// `exempt_routes` entries are `"METHOD /path"` strings matched exactly.
    pub fn new<I, S>(verifier: Arc<dyn AccessTokenVerifier>, exempt_routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verifier,
            exempt_routes: exempt_routes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_exempt(&self, method: &Method, path: &str) -> bool {
        self.exempt_routes
            .contains(&format!("{} {}", method.as_str(), path))
    }

    /// Resolve the subject of the request's bearer token.
    ///
    /// Exempt routes never fail: without a usable token they resolve to an
    /// empty subject. Elsewhere a missing token is [`AuthError::TokenMissing`]
    /// and a rejected one carries the verification error.
    pub fn authenticate<B>(&self, request: &Request<B>) -> Result<String, AuthError> {
        let exempt = self.is_exempt(request.method(), request.uri().path());

        let Some(token) = get_bearer_token(request.headers()) else {
            if exempt {
                return Ok(String::new());
            }
            return Err(AuthError::TokenMissing);
        };

        match self.verifier.verify_access(token) {
            Ok(subject) => Ok(subject),
            Err(_) if exempt => Ok(String::new()),
            Err(e) => Err(AuthError::InvalidToken(e)),
        }
    }
}
