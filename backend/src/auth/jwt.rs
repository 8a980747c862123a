use super::models::{AuthUser, Claims};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("could not sign session token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("could not read session token: {0}")]
    Decoding(String),
    #[error("session token is invalid")]
    InvalidToken,
    #[error("session token has expired")]
    TokenExpired,
}

/// Signs and verifies the session cookie value.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }

    /// Issues the cookie value for a session. The token carries the session
    /// id; the server-side row decides whether it is still live.
    pub fn sign_session(
        &self,
        session_id: &str,
        user: &AuthUser,
        expires_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = Claims {
            sid: session_id.to_string(),
            sub: user.id.to_string(),
            username: user.username.clone(),
            exp: expires_at.timestamp() as usize,
            iat: Utc::now().timestamp() as usize,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    pub fn open_session(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| {
                log::debug!("Rejected session token: {:?}", err);
                match err.kind() {
                    ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                    ErrorKind::InvalidToken | ErrorKind::InvalidSignature | ErrorKind::Base64(_) => {
                        JwtError::InvalidToken
                    }
                    _ => JwtError::Decoding(err.to_string()),
                }
            })
    }
}
