//! bcrypt password hashing, run on the blocking thread pool.

use tokio::task::spawn_blocking;

/// Lowest cost bcrypt accepts. Only sensible for tests.
pub const MIN_BCRYPT_COST: u32 = 4;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub async fn hash_password(password: String, cost: u32) -> Result<String, PasswordError> {
    Ok(spawn_blocking(move || bcrypt::hash(password, cost)).await??)
}

/// Check a password against a stored hash. A mismatch is `Ok(false)`.
pub async fn verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
    Ok(spawn_blocking(move || bcrypt::verify(password, &hash)).await??)
}
