//! Execution bridge between agents and the task lifecycle.

pub mod bridge;

pub use bridge::TaskLifecycleBridge;

use thiserror::Error;

use crate::tasks::SinkError;

/// Errors surfaced to the caller of the bridge.
///
/// Agent failures are not among them: those end the task as `failed`.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// A precondition of `execute` was violated.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The task store refused a commit.
    #[error("Status sink error: {0}")]
    Sink(#[from] SinkError),

    /// The operation is not offered by the bridge.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}
