//! Error types shared across agent-workers subsystems.
//!
//! Subsystem-specific errors live next to their code (`ToolError` in the
//! tool registry, `LoopError` in the agent loop, `ExecutorError` in the
//! bridge). This module holds the ones several subsystems depend on:
//! - LLM API interactions
//! - Settings resolution
//! - Checkpoint persistence

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API base URL: LLM_BASE_URL is not configured")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("LLM returned no choices")]
    EmptyResponse,
}

/// Errors that can occur while resolving application settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read secrets file '{path}': {source}")]
    SecretsRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid secrets file '{path}': {source}")]
    SecretsParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur while loading or saving conversation checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid thread id: {0}")]
    InvalidThreadId(String),
}
