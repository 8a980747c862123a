use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::RepositoryError;
use super::models::SessionRecord;

#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_session(
        &self,
        token_hash: &str,
        user_id: i64,
        username: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionRecord, RepositoryError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO sessions (token_hash, user_id, username, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING token_hash, user_id, username, created_at, expires_at
            "#,
        )
        .bind(token_hash)
        .bind(user_id)
        .bind(username)
        .bind(Utc::now())
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, "session"))?;
        Ok(record)
    }

    /// Returns the session only while it is still live.
    pub async fn get_session(
        &self,
        token_hash: &str,
    ) -> Result<Option<SessionRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT token_hash, user_id, username, created_at, expires_at
            FROM sessions WHERE token_hash = ?1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.filter(|session| !session.is_expired()))
    }

    pub async fn delete_session(&self, token_hash: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
