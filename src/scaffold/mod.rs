//! Stateful agent loop and its tools.
//!
//! The loop is a plan/act/suspend state machine over a per-thread
//! [`ConversationState`] (chat history plus a JSON data store):
//! 1. Plan: ask the model, with the data store in the system message
//! 2. Act: run the tool calls it requested
//! 3. Suspend: stop and wait for the user, checkpointing the thread
//!
//! # Example
//!
//! ```ignore
//! use agent_workers::scaffold::{LoopConfig, MemoryCheckpointer, StatefulAgentLoop, TurnInput};
//! use agent_workers::llm::OpenAiChatModel;
//!
//! let model = Arc::new(OpenAiChatModel::new("http://localhost:11434/v1", None, "gpt-oss:20b")?);
//! let agent = StatefulAgentLoop::new(model, Arc::new(MemoryCheckpointer::new()), LoopConfig::default());
//! let result = agent.run_turn(Some("task-1"), TurnInput::User("Remember I like tea".into())).await?;
//! ```

pub mod agent_loop;
pub mod checkpoint;
pub mod interrupt;
pub mod prompts;
pub mod state;
pub mod tools;

pub use agent_loop::{LoopConfig, LoopError, StatefulAgentLoop, TurnInput, TurnOutcome, TurnResult};
pub use checkpoint::{
    Checkpoint, Checkpointer, FileCheckpointer, LoopNode, MemoryCheckpointer, SuspensionPoint,
};
pub use interrupt::validate_suspension;
pub use prompts::{build_system_prompt, AGENT_SYSTEM_PROMPT};
pub use state::{ConversationState, StateUpdate};
pub use tools::{Tool, ToolError, ToolOutput, ToolRegistry};
