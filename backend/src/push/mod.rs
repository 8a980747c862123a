//! Live push channel: one Server-Sent Events stream per session.

pub mod registry;
pub mod sse;

pub use registry::{SessionLifecycle, SessionRegistry};
pub use sse::PushStream;
