use std::sync::Arc;
use std::time::Duration;

use super::{Claims, Clock, JwtError, Signer, TokenKind};

/// Mints access and refresh tokens for a subject.
pub trait TokenIssuer: Send + Sync {
    fn issue_access_token(&self, subject: &str) -> Result<String, JwtError>;
    fn issue_refresh_token(&self, subject: &str) -> Result<String, JwtError>;
}

/// Token issuer backed by the shared HMAC secret.
pub struct Issuer {
    issuer: String,
    signer: Arc<Signer>,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Issuer {
    pub fn new(
        issuer: String,
        signer: Arc<Signer>,
        clock: Arc<dyn Clock>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            issuer,
            signer,
            clock,
            access_ttl,
            refresh_ttl,
        }
    }

    fn issue(&self, subject: &str, kind: TokenKind) -> Result<String, JwtError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = self.clock.now();

        self.signer.sign(&Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            typ: kind.as_str().to_string(),
            iat: now,
            exp: now.saturating_add(ttl.as_secs()),
        })
    }
}

impl TokenIssuer for Issuer {
    fn issue_access_token(&self, subject: &str) -> Result<String, JwtError> {
        self.issue(subject, TokenKind::Access)
    }

    fn issue_refresh_token(&self, subject: &str) -> Result<String, JwtError> {
        self.issue(subject, TokenKind::Refresh)
    }
}
