//! agent-workers: task-oriented agents over a stateful tool-calling loop.
//!
//! This library provides the execution bridge that maps agent results onto
//! the task lifecycle, the agent capability contract, a checkpointed
//! plan/act/suspend agent loop, and the JSON data-store tools it uses.

// Core modules
pub mod agents;
pub mod cli;
pub mod error;
pub mod executor;
pub mod llm;
pub mod protocol;
pub mod scaffold;
pub mod settings;
pub mod tasks;

// Re-export commonly used error types
pub use error::{CheckpointError, LlmError, SettingsError};
