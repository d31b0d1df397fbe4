//! Tool definitions and registry for the agent loop.
//!
//! This module defines the `Tool` trait and provides a registry for the
//! tools the model can call. Tools read the current conversation state and
//! either answer with a value or ask the loop to update the state.

pub mod calculate;
pub mod clock;
pub mod patch;
pub mod query;

pub use calculate::CalculateTool;
pub use clock::CurrentTimeTool;
pub use patch::{apply_patch, PatchTool};
pub use query::{query, JsonPath, PathError, QueryTool};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::state::{ConversationState, StateUpdate};
use crate::llm::ToolDefinition;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments or the documents they carry are unusable.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No tool is registered under the requested name.
    #[error("Tool not found: {0}")]
    NotFound(String),
}

/// What a tool hands back to the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain result, appended to history as the tool message.
    Value(String),
    /// State change plus the text of the tool message confirming it.
    Update { update: StateUpdate, message: String },
}

impl ToolOutput {
    pub fn value(text: impl Into<String>) -> Self {
        ToolOutput::Value(text.into())
    }

    /// Text recorded as the tool-result message.
    pub fn message(&self) -> &str {
        match self {
            ToolOutput::Value(text) => text,
            ToolOutput::Update { message, .. } => message,
        }
    }
}

/// Trait for tools that can be called by the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of the tool.
    fn name(&self) -> &str;

    /// Returns a description of what the tool does.
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments against the current state.
    async fn execute(&self, args: Value, state: &ConversationState) -> Result<ToolOutput, ToolError>;
}

/// Read a required string argument.
pub(crate) fn string_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArgument(format!("missing string argument '{}'", name)))
}

/// Registry for managing available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry with the query, patch, clock and calculator tools.
    pub fn with_default_tools() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(QueryTool));
        registry.register(Arc::new(PatchTool));
        registry.register(Arc::new(CurrentTimeTool));
        registry.register(Arc::new(CalculateTool));
        registry
    }

    /// Register a new tool in the registry.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names, sorted.
    pub fn list_tools(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions to bind to the model, in name order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.list_tools()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Look up `name` and run it. Arguments must be a JSON object.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        state: &ConversationState,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        if !args.is_object() {
            return Err(ToolError::InvalidArgument(format!(
                "arguments for '{}' must be a JSON object, got: {}",
                name, args
            )));
        }
        tool.execute(args, state).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
