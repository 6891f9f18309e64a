use sqlx::sqlite::SqlitePool;

use super::is_unique_violation;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    /// UUID, used as the token subject
    pub id: String,
    pub email: String,
    /// bcrypt hash
    #[sqlx(rename = "password")]
    pub password_hash: String,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            password_hash: password_hash.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("email is already registered")]
    EmailBusy,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new user. Fails with [`UserError::EmailBusy`] if the email is taken.
    pub async fn create(&self, user: &User) -> Result<(), UserError> {
        sqlx::query("INSERT INTO users (id, email, password) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    UserError::EmailBusy
                } else {
                    UserError::Database(e)
                }
            })?;
        Ok(())
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT id, email, password FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT id, email, password FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Replace the password hash. Returns false if no such user exists.
    pub async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
