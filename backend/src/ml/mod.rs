pub mod http_trainer;
pub mod trainer;

pub use http_trainer::HttpTrainer;
pub use trainer::{ModelTrainer, TrainerError, TrainingOutcome, VerificationReport};
