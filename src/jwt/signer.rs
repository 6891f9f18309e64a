use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;

use super::{Claims, JwtError};

const HMAC_ALGORITHMS: [&str; 3] = ["HS256", "HS384", "HS512"];

/// Just enough of the JOSE header to read `alg`, whatever its value.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// `alg` of a token whose header segment parses, `None` otherwise.
fn header_alg(token: &str) -> Option<String> {
    let segment = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice::<RawHeader>(&bytes)
        .ok()
        .map(|header| header.alg)
}

/// HMAC signing primitive.
///
/// Signs with HS256 and accepts any algorithm of the HMAC family when
/// decoding. Time, issuer and type checks are left to the verifier so each
/// one fails with its own error.
pub struct Signer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    empty_secret: bool,
}

impl Signer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            empty_secret: secret.is_empty(),
        }
    }

    /// Sign the claims into a compact `header.payload.signature` string.
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        if self.empty_secret {
            return Err(JwtError::Signing("signing secret is empty".into()));
        }
        jsonwebtoken::encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    /// Check the structure and MAC of a token and return its claims unvalidated.
    ///
    /// A readable header naming anything outside the HMAC family (`none`
    /// included) is a signature failure, not a malformed token.
    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        if let Some(alg) = header_alg(token) {
            if !HMAC_ALGORITHMS.contains(&alg.as_str()) {
                return Err(JwtError::SignatureInvalid(ErrorKind::InvalidAlgorithm.into()));
            }
        }

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName
                | ErrorKind::InvalidKeyFormat => JwtError::SignatureInvalid(e),
                _ => JwtError::Malformed(e),
            })
    }
}
