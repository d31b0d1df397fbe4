//! Language model integration.
//!
//! The agent loop only sees the [`ChatModel`] trait: a function from a list
//! of chat turns plus the bound tool definitions to the next assistant turn.
//! [`OpenAiChatModel`] is the production implementation.
//!
//! ```ignore
//! use agent_workers::llm::{ChatMessage, ChatModel, OpenAiChatModel};
//!
//! let model = OpenAiChatModel::new("http://localhost:11434/v1", None, "gpt-oss:20b")?;
//! let reply = model.invoke(&[ChatMessage::user("Hello!")], &[]).await?;
//! println!("{}", reply.content);
//! ```

pub mod messages;
pub mod openai;

pub use messages::{ChatMessage, ChatModel, ChatRole, ToolCall, ToolDefinition};
pub use openai::OpenAiChatModel;
