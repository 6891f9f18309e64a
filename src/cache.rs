//! Key-value cache with per-key expiry, used to track outstanding refresh tokens.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache key: SHA-256 digest of the raw token.
pub type RevocationKey = [u8; 32];

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("key not found")]
    NotFound,
    #[error("cache operation timed out")]
    Timeout,
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Presence-only cache with TTL.
///
/// Implementations must make `get_and_delete` atomic: two concurrent calls for
/// the same key may not both succeed.
#[async_trait]
pub trait RevocationCache: Send + Sync {
    /// Store `key` for `ttl`, replacing any previous expiry.
    async fn set(&self, key: &RevocationKey, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`, failing with [`CacheError::NotFound`] if it is absent or expired.
    async fn get_and_delete(&self, key: &RevocationKey) -> Result<(), CacheError>;

    /// Drop expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, CacheError>;
}

/// Stand-in expiry for TTLs too large to add to an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Process-local cache. Entries do not survive a restart.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<RevocationKey, Instant>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<RevocationKey, Instant>>, CacheError> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Backend("memory cache lock poisoned".into()))
    }
}

#[async_trait]
impl RevocationCache for MemoryCache {
    async fn set(&self, key: &RevocationKey, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .ok_or_else(|| CacheError::Backend("expiry is out of range".into()))?;
        self.lock()?.insert(*key, expires_at);
        Ok(())
    }

    async fn get_and_delete(&self, key: &RevocationKey) -> Result<(), CacheError> {
        match self.lock()?.remove(key) {
            Some(expires_at) if expires_at > Instant::now() => Ok(()),
            _ => Err(CacheError::NotFound),
        }
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}
