pub mod coordinator;
pub mod state;

pub use coordinator::JobCoordinator;
pub use state::{JobBoard, JobKey, JobKind, JobState};

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("push channel not connected")]
    NotConnected,
    #[error("model not found")]
    ModelNotFound,
    #[error("{0} is already running")]
    AlreadyRunning(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored job artifact is unreadable: {0}")]
    Corrupt(String),
}
