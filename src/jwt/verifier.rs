use std::sync::Arc;
use std::time::Duration;

use super::{Clock, JwtError, Signer, TokenKind};

/// Resolves the subject of an access token.
pub trait AccessTokenVerifier: Send + Sync {
    fn verify_access(&self, token: &str) -> Result<String, JwtError>;
}

/// Resolves the subject of a refresh token.
pub trait RefreshTokenVerifier: Send + Sync {
    fn verify_refresh(&self, token: &str) -> Result<String, JwtError>;
}

/// Token verifier backed by the shared HMAC secret.
pub struct Verifier {
    issuer: String,
    signer: Arc<Signer>,
    clock: Arc<dyn Clock>,
    leeway: u64,
}

impl Verifier {
    pub fn new(issuer: String, signer: Arc<Signer>, clock: Arc<dyn Clock>, leeway: Duration) -> Self {
        Self {
            issuer,
            signer,
            clock,
            leeway: leeway.as_secs(),
        }
    }

    /// Validate signature, validity window, issuer, type and subject, in that order.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<String, JwtError> {
        let claims = self.signer.decode(token)?;

        let now = self.clock.now();
        if now >= claims.exp.saturating_add(self.leeway)
            || claims.iat > now.saturating_add(self.leeway)
        {
            return Err(JwtError::TokenExpiredOrNotYetValid);
        }

        if claims.iss != self.issuer {
            return Err(JwtError::IssuerMismatch);
        }

        if claims.typ != expected.as_str() {
            return Err(JwtError::TypeMismatch {
                expected: expected.as_str(),
            });
        }

        if claims.sub.is_empty() {
            return Err(JwtError::SubjectMissing);
        }

        Ok(claims.sub)
    }
}

impl AccessTokenVerifier for Verifier {
    fn verify_access(&self, token: &str) -> Result<String, JwtError> {
        self.verify(token, TokenKind::Access)
    }
}

impl RefreshTokenVerifier for Verifier {
    fn verify_refresh(&self, token: &str) -> Result<String, JwtError> {
        self.verify(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::{Claims, JwtConfig, ManualClock, TokenIssuer};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    const SECRET: &[u8] = b"test-secret-key-for-testing";
    const NOW: u64 = 1_700_000_000;

    fn config(clock: Arc<ManualClock>) -> JwtConfig {
        JwtConfig::new("tokenward", SECRET)
            .with_ttls(Duration::from_secs(300), Duration::from_secs(3600))
            .with_clock(clock)
    }

    fn sign(claims: &Claims) -> String {
        Signer::new(SECRET).sign(claims).unwrap()
    }

    fn claims() -> Claims {
        Claims {
            iss: "tokenward".to_string(),
            sub: "user-1".to_string(),
            typ: "access_token".to_string(),
            iat: NOW,
            exp: NOW + 300,
        }
    }

    #[test]
    fn test_access_round_trip() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let token = config.issuer().issue_access_token("user-1").unwrap();
        assert_eq!(config.verifier().verify_access(&token).unwrap(), "user-1");
    }

    #[test]
    fn test_refresh_round_trip() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let token = config.issuer().issue_refresh_token("user-1").unwrap();
        assert_eq!(config.verifier().verify_refresh(&token).unwrap(), "user-1");
    }

    #[test]
    fn test_type_isolation() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let issuer = config.issuer();
        let verifier = config.verifier();

        let access = issuer.issue_access_token("user-1").unwrap();
        let refresh = issuer.issue_refresh_token("user-1").unwrap();

        assert!(matches!(
            verifier.verify_refresh(&access),
            Err(JwtError::TypeMismatch { expected: "refresh_token" })
        ));
        assert!(matches!(
            verifier.verify_access(&refresh),
            Err(JwtError::TypeMismatch { expected: "access_token" })
        ));
    }

    #[test]
    fn test_tampered_subject_fails_signature() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let token = config.issuer().issue_access_token("user-1").unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let mut forged = claims();
        forged.sub = "admin".to_string();
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let tampered = format!("{}.{}.{}", parts[0], payload, parts[2]);

        assert!(matches!(
            config.verifier().verify_access(&tampered),
            Err(JwtError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_non_hmac_algorithm_fails_signature() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"RS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims()).unwrap());
        let token = format!("{}.{}.{}", header, payload, URL_SAFE_NO_PAD.encode(b"sig"));

        assert!(matches!(
            config.verifier().verify_access(&token),
            Err(JwtError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_alg_none_fails_signature() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims()).unwrap());

        for token in [
            format!("{}.{}.", header, payload),
            format!("{}.{}.{}", header, payload, URL_SAFE_NO_PAD.encode(b"sig")),
        ] {
            assert!(matches!(
                config.verifier().verify_access(&token),
                Err(JwtError::SignatureInvalid(_))
            ));
        }
    }

    #[test]
    fn test_unknown_algorithm_fails_signature() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let header = URL_SAFE_NO_PAD.encode(br#"{"typ":"JWT","alg":"XS999"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims()).unwrap());
        let token = format!("{}.{}.{}", header, payload, URL_SAFE_NO_PAD.encode(b"sig"));

        assert!(matches!(
            config.verifier().verify_access(&token),
            Err(JwtError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let token = JwtConfig::new("tokenward", b"another-secret-another-secret!!!")
            .with_clock(Arc::new(ManualClock::new(NOW)))
            .issuer()
            .issue_access_token("user-1")
            .unwrap();

        assert!(matches!(
            config.verifier().verify_access(&token),
            Err(JwtError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let clock = Arc::new(ManualClock::new(NOW));
        let config = config(clock).with_ttls(Duration::ZERO, Duration::ZERO);
        let token = config.issuer().issue_access_token("user-1").unwrap();

        assert!(matches!(
            config.verifier().verify_access(&token),
            Err(JwtError::TokenExpiredOrNotYetValid)
        ));
    }

    #[test]
    fn test_expired_after_clock_advances() {
        let clock = Arc::new(ManualClock::new(NOW));
        let config = config(clock.clone());
        let token = config.issuer().issue_access_token("user-1").unwrap();

        clock.advance(Duration::from_secs(299));
        assert!(config.verifier().verify_access(&token).is_ok());

        clock.advance(Duration::from_secs(1));
        assert!(matches!(
            config.verifier().verify_access(&token),
            Err(JwtError::TokenExpiredOrNotYetValid)
        ));
    }

    #[test]
    fn test_leeway_tolerates_skew() {
        let clock = Arc::new(ManualClock::new(NOW));
        let config = config(clock.clone()).with_leeway(Duration::from_secs(30));
        let token = config.issuer().issue_access_token("user-1").unwrap();

        clock.advance(Duration::from_secs(320));
        assert!(config.verifier().verify_access(&token).is_ok());

        clock.advance(Duration::from_secs(10));
        assert!(config.verifier().verify_access(&token).is_err());
    }

    #[test]
    fn test_not_yet_valid() {
        let clock = Arc::new(ManualClock::new(NOW));
        let config = config(clock.clone());
        let token = config.issuer().issue_access_token("user-1").unwrap();

        clock.rewind(Duration::from_secs(60));
        assert!(matches!(
            config.verifier().verify_access(&token),
            Err(JwtError::TokenExpiredOrNotYetValid)
        ));
    }

    #[test]
    fn test_issuer_mismatch() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let mut claims = claims();
        claims.iss = "someone-else".to_string();

        assert!(matches!(
            config.verifier().verify_access(&sign(&claims)),
            Err(JwtError::IssuerMismatch)
        ));
    }

    #[test]
    fn test_missing_subject() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let mut claims = claims();
        claims.sub = String::new();

        assert!(matches!(
            config.verifier().verify_access(&sign(&claims)),
            Err(JwtError::SubjectMissing)
        ));
    }

    #[test]
    fn test_checks_run_in_order() {
        // Expired and from the wrong issuer: the time check comes first.
        let config = config(Arc::new(ManualClock::new(NOW)));
        let mut claims = claims();
        claims.iss = "someone-else".to_string();
        claims.exp = NOW - 1;

        assert!(matches!(
            config.verifier().verify_access(&sign(&claims)),
            Err(JwtError::TokenExpiredOrNotYetValid)
        ));
    }

    #[test]
    fn test_unknown_type_is_type_mismatch() {
        let config = config(Arc::new(ManualClock::new(NOW)));
        let mut claims = claims();
        claims.typ = "id_token".to_string();

        assert!(matches!(
            config.verifier().verify_access(&sign(&claims)),
            Err(JwtError::TypeMismatch { .. })
        ));
    }
}
