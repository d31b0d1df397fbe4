//! Error types for agent implementations.
//!
//! Anything an agent raises while answering a turn is an `AgentError`; the
//! execution bridge turns every one of them into a failed task.

use thiserror::Error;

/// Errors that can occur during agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The stateful agent loop aborted the turn.
    #[error(transparent)]
    Loop(#[from] crate::scaffold::LoopError),

    /// The requested operation is not implemented by this agent.
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    /// Any other agent-side failure.
    #[error("{0}")]
    Failed(String),
}

/// Result type for agent operations.
pub type AgentResult<T> = std::result::Result<T, AgentError>;
