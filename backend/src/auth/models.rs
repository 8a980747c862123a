use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::UserProfile;

use crate::db::models::{SessionRecord, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

impl From<AuthUser> for UserProfile {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// Payload of the signed session cookie.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sid: String, // Session ID
    pub sub: String, // User ID
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}

/// The authenticated session attached to a request by the middleware.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn from_record(session_id: String, record: &SessionRecord) -> Self {
        Self {
            session_id,
            user: AuthUser {
                id: record.user_id,
                username: record.username.clone(),
            },
            expires_at: record.expires_at,
        }
    }
}
