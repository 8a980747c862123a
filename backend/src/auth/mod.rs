pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod routes;
pub mod session;

use crate::config::SessionConfig;

/// How the session cookie is named and flagged.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

impl From<&SessionConfig> for CookieSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            secure: config.secure_cookie,
        }
    }
}
