use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheError, RevocationCache, RevocationKey};

/// Default bound on a single cache round-trip.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(1);

/// Tracks outstanding refresh tokens so each one can be used at most once.
///
/// Only the SHA-256 digest of a token is handed to the cache, never the token itself.
#[derive(Clone)]
pub struct RefreshTokenStore {
    cache: Arc<dyn RevocationCache>,
    ttl: Duration,
    timeout: Duration,
}

impl RefreshTokenStore {
    pub fn new(cache: Arc<dyn RevocationCache>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            timeout: DEFAULT_CACHE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Record a freshly issued refresh token. Saving the same token again resets its TTL.
    pub async fn save(&self, token: &str) -> Result<(), CacheError> {
        let key = hash(token);
        self.bounded(self.cache.set(&key, self.ttl)).await
    }

    /// Consume a refresh token. Fails if it was never saved, already popped or expired.
    pub async fn pop(&self, token: &str) -> Result<(), CacheError> {
        let key = hash(token);
        self.bounded(self.cache.get_and_delete(&key)).await
    }

    async fn bounded<F>(&self, operation: F) -> Result<(), CacheError>
    where
        F: Future<Output = Result<(), CacheError>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| CacheError::Timeout)?
    }
}

fn hash(token: &str) -> RevocationKey {
    Sha256::digest(token.as_bytes()).into()
}
