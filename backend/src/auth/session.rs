use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};

use super::jwt::{JwtError, JwtService};
use super::models::{AuthUser, SessionContext};
use crate::db::RepositoryError;
use crate::db::session_repository::SessionRepository;
use crate::push::registry::SessionLifecycle;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session token rejected: {0}")]
    Token(#[from] JwtError),
    #[error("Session not found or expired")]
    Unknown,
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Server-side sessions: a random id lives in the signed cookie, its hash in the database.
#[derive(Clone)]
pub struct SessionService {
    jwt: JwtService,
    sessions: SessionRepository,
    ttl: Duration,
}

impl SessionService {
    pub fn new(jwt: JwtService, sessions: SessionRepository, ttl_minutes: i64) -> Self {
        Self {
            jwt,
            sessions,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a session and returns the cookie value alongside it.
    pub async fn create(&self, user: &AuthUser) -> Result<(String, SessionContext), SessionError> {
        let session_id = new_session_id();
        let expires_at = Utc::now() + self.ttl;

        let record = self
            .sessions
            .create_session(&hash_session_id(&session_id), user.id, &user.username, expires_at)
            .await?;
        let token = self.jwt.sign_session(&session_id, user, expires_at)?;

        log::info!("Session created for user {}", user.username);
        Ok((token, SessionContext::from_record(session_id, &record)))
    }

    pub async fn resolve(&self, token: &str) -> Result<SessionContext, SessionError> {
        let claims = self.jwt.open_session(token)?;
        let record = self
            .sessions
            .get_session(&hash_session_id(&claims.sid))
            .await?
            .ok_or(SessionError::Unknown)?;
        Ok(SessionContext::from_record(claims.sid, &record))
    }

    pub async fn destroy(&self, session_id: &str) -> Result<bool, SessionError> {
        Ok(self
            .sessions
            .delete_session(&hash_session_id(session_id))
            .await?)
    }

    pub async fn purge_expired(&self) -> Result<u64, SessionError> {
        Ok(self.sessions.purge_expired().await?)
    }
}

#[async_trait]
impl SessionLifecycle for SessionService {
    async fn session_expired(&self, session_id: &str) {
        match self.destroy(session_id).await {
            Ok(_) => log::info!("Expired session destroyed"),
            Err(e) => log::error!("Failed to destroy expired session: {:?}", e),
        }
    }
}

pub fn new_session_id() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_session_id(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::db::user_repository::UserRepository;

    async fn service() -> (SessionService, AuthUser) {
        let pool = connect_in_memory().await.unwrap();
        let user = UserRepository::new(pool.clone())
            .create_user("alice", "hash")
            .await
            .unwrap();
        let service = SessionService::new(
            JwtService::new("0123456789abcdef0123"),
            SessionRepository::new(pool),
            100,
        );
        (service, AuthUser::from(user))
    }

    #[tokio::test]
    async fn created_session_resolves_until_destroyed() {
        let (service, user) = service().await;

        let (token, context) = service.create(&user).await.unwrap();
        assert_eq!(context.user.username, "alice");

        let resolved = service.resolve(&token).await.unwrap();
        assert_eq!(resolved.session_id, context.session_id);
        assert_eq!(resolved.user.id, user.id);

        assert!(service.destroy(&context.session_id).await.unwrap());
        assert!(matches!(
            service.resolve(&token).await,
            Err(SessionError::Unknown)
        ));
    }

    #[tokio::test]
    async fn lifecycle_hook_destroys_the_session() {
        let (service, user) = service().await;
        let (token, context) = service.create(&user).await.unwrap();

        service.session_expired(&context.session_id).await;
        assert!(service.resolve(&token).await.is_err());
    }

    #[test]
    fn session_ids_are_random_and_hashes_stable() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert_eq!(hash_session_id(&a), hash_session_id(&a));
        assert_eq!(hash_session_id(&a).len(), 64);
    }
}
