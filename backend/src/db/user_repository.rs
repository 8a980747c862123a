use chrono::Utc;
use sqlx::SqlitePool;

use super::RepositoryError;
use super::models::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        log::info!("Creating user: {}", username);

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash, created_at)
            VALUES (?1, ?2, ?3)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_insert(e, username))?;

        log::info!("Created user {} with id {}", user.username, user.id);
        Ok(user)
    }

    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let repo = UserRepository::new(connect_in_memory().await.unwrap());

        let user = repo.create_user("alice", "hash").await.unwrap();
        assert_eq!(user.username, "alice");

        let err = repo.create_user("alice", "other").await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let fetched = repo.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.password_hash, "hash");
        assert!(repo.get_user_by_username("bob").await.unwrap().is_none());
    }
}
