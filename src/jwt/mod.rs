//! JWT token generation, validation and refresh-token revocation.
//!
//! Two token kinds share one signing secret:
//! - Access tokens: short-lived, stateless, checked on every request
//! - Refresh tokens: long-lived, exchanged once for a new pair; each one is
//!   tracked in a [`RefreshTokenStore`] so it can be consumed or revoked

mod clock;
mod issuer;
mod signer;
mod storage;
mod verifier;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub use clock::{Clock, ManualClock, SystemClock};
pub use issuer::{Issuer, TokenIssuer};
pub use signer::Signer;
pub use storage::{DEFAULT_CACHE_TIMEOUT, RefreshTokenStore};
pub use verifier::{AccessTokenVerifier, RefreshTokenVerifier, Verifier};

/// Default access token lifetime: 15 minutes
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh token lifetime: 2 weeks
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Value carried in the `typ` claim.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access_token",
            TokenKind::Refresh => "refresh_token",
        }
    }
}

/// Claims carried by both token kinds.
///
/// `iss`, `sub` and `typ` default to empty so that a token missing them
/// reaches the claim checks and fails with a specific error instead of a
/// generic decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    #[serde(default)]
    pub iss: String,
    /// Subject (user id)
    #[serde(default)]
    pub sub: String,
    /// Token type, see [`TokenKind::as_str`]
    #[serde(default)]
    pub typ: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("malformed token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
    #[error("token signature is invalid: {0}")]
    SignatureInvalid(#[source] jsonwebtoken::errors::Error),
    #[error("token is expired or not yet valid")]
    TokenExpiredOrNotYetValid,
    #[error("token issuer does not match")]
    IssuerMismatch,
    #[error("token type does not match, expected {expected}")]
    TypeMismatch { expected: &'static str },
    #[error("token subject is missing")]
    SubjectMissing,
}

/// Immutable token settings shared by the issuer and verifier.
#[derive(Clone)]
pub struct JwtConfig {
    issuer: String,
    signer: Arc<Signer>,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    leeway: Duration,
}

impl JwtConfig {
    /// Create a configuration with the default TTLs, no leeway and the system clock.
    pub fn new(issuer: impl Into<String>, secret: &[u8]) -> Self {
        Self {
            issuer: issuer.into(),
            signer: Arc::new(Signer::new(secret)),
            clock: Arc::new(SystemClock),
            access_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            leeway: Duration::ZERO,
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issuer(&self) -> Issuer {
        Issuer::new(
            self.issuer.clone(),
            self.signer.clone(),
            self.clock.clone(),
            self.access_ttl,
            self.refresh_ttl,
        )
    }

    pub fn verifier(&self) -> Verifier {
        Verifier::new(
            self.issuer.clone(),
            self.signer.clone(),
            self.clock.clone(),
            self.leeway,
        )
    }
}
