pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod ml;
pub mod push;
pub mod routes;
pub mod state;
pub mod storage;

pub use config::AppConfig;
pub use error::ApiError;
pub use state::AppState;
