pub mod compression;
pub mod image_store;
pub mod layout;
pub mod locks;
pub mod naming;
pub mod project_store;

use crate::db::RepositoryError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{0}")]
    InvalidName(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Background task failed: {0}")]
    Task(String),
}

impl StorageError {
    /// Like `From<io::Error>`, but names the missing thing on `NotFound`.
    pub(crate) fn io_for(err: std::io::Error, what: impl Into<String>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(what.into())
        } else {
            StorageError::Io(err)
        }
    }
}
