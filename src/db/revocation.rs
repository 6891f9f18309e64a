//! SQLite-backed revocation cache.
//!
//! Entries outlive a restart. Expiry is stored as Unix milliseconds; expired
//! rows are invisible to reads and removed by the cleanup scheduler.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::cache::{CacheError, RevocationCache, RevocationKey};

#[derive(Clone)]
pub struct RevocationTable {
    pool: SqlitePool,
}

impl RevocationTable {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn backend(e: sqlx::Error) -> CacheError {
    CacheError::Backend(e.to_string())
}

#[async_trait]
impl RevocationCache for RevocationTable {
    async fn set(&self, key: &RevocationKey, ttl: Duration) -> Result<(), CacheError> {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_millis().saturating_add(ttl_millis);

        sqlx::query(
            "INSERT INTO revocation_entries (key, expires_at) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET expires_at = excluded.expires_at",
        )
        .bind(&key[..])
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get_and_delete(&self, key: &RevocationKey) -> Result<(), CacheError> {
        // Single statement so concurrent pops of the same key cannot both see a row.
        let row: Option<(i64,)> = sqlx::query_as(
            "DELETE FROM revocation_entries WHERE key = ? RETURNING expires_at",
        )
        .bind(&key[..])
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some((expires_at,)) if expires_at > now_millis() => Ok(()),
            _ => Err(CacheError::NotFound),
        }
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM revocation_entries WHERE expires_at <= ?")
            .bind(now_millis())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }
}
