use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::MessageResponse;

use crate::auth::password::PasswordError;
use crate::auth::session::SessionError;
use crate::db::RepositoryError;
use crate::jobs::JobError;
use crate::storage::StorageError;

/// Every failure a handler can surface, rendered as `{ success: false, message }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("not authenticated")]
    Unauthorized,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("push channel not connected")]
    NotConnected,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(detail: impl std::fmt::Display) -> Self {
        ApiError::Internal(detail.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::NotConnected => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::Internal(detail) => {
                log::error!("Internal error: {}", detail);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(MessageResponse {
            success: false,
            message,
        })
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ApiError::NotFound("file or directory not found".into()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ApiError::NotFound("item not found".into()),
            RepositoryError::Conflict(what) => ApiError::Conflict(format!("{} already exists", what)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(message) | StorageError::Unsupported(message) => {
                ApiError::Validation(message)
            }
            StorageError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            StorageError::AlreadyExists(what) => ApiError::Conflict(format!("{} already exists", what)),
            StorageError::Io(io) => ApiError::from(io),
            StorageError::Repository(repo) => ApiError::from(repo),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Repository(repo) => ApiError::from(repo),
            SessionError::Token(_) | SessionError::Unknown => ApiError::Unauthorized,
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotConnected => ApiError::NotConnected,
            JobError::ModelNotFound => ApiError::NotFound("model not found, train the project first".into()),
            JobError::AlreadyRunning(what) => ApiError::Conflict(format!("{} is already running", what)),
            JobError::Storage(storage) => ApiError::from(storage),
            JobError::Io(io) => ApiError::from(io),
            JobError::Corrupt(detail) => ApiError::Internal(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NotConnected.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::PayloadTooLarge("x".into()).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn io_not_found_maps_to_404() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));

        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert!(matches!(ApiError::from(err), ApiError::Internal(_)));
    }

    #[test]
    fn repository_conflict_maps_to_409() {
        let err = ApiError::from(RepositoryError::Conflict("alice".into()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "alice already exists");
    }
}
