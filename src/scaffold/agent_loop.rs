//! Stateful plan/act/suspend agent loop.
//!
//! One turn of the loop:
//! 1. Load the thread's checkpoint and append the new user input
//! 2. `plan`: refresh the system message with the data store, ask the model
//! 3. `act`: run requested tool calls, then plan again
//! 4. `suspend`: record the assistant turn as a suspension point and stop
//!
//! The checkpoint is saved after every node, so the next turn on the same
//! thread continues with the same history and data.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::checkpoint::{Checkpoint, Checkpointer, LoopNode, SuspensionPoint};
use super::interrupt::validate_suspension;
use super::prompts::{build_system_prompt, AGENT_SYSTEM_PROMPT};
use super::state::ConversationState;
use super::tools::{ToolOutput, ToolRegistry};
use crate::error::{CheckpointError, LlmError};
use crate::llm::{ChatMessage, ChatModel, ChatRole};

/// Errors that abort a turn of the agent loop.
#[derive(Debug, Error)]
pub enum LoopError {
    /// Suspension invariant violated or no usable reply produced.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for the agent loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum nodes run in a single turn. Only `plan` is refused once the
    /// budget is spent; the `act` or `suspend` that follows an accepted
    /// `plan` always runs so history never ends in unanswered tool calls.
    pub max_steps: usize,
    /// Suspend for user input after a tool-free reply instead of finishing.
    pub suspend_on_reply: bool,
    /// Instructions placed ahead of the data store in the system message.
    pub system_prompt: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_steps: 25,
            suspend_on_reply: true,
            system_prompt: AGENT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl LoopConfig {
    /// Create a new loop configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of steps per turn.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set whether tool-free replies suspend the thread.
    pub fn with_suspend_on_reply(mut self, suspend_on_reply: bool) -> Self {
        self.suspend_on_reply = suspend_on_reply;
        self
    }

    /// Set the system prompt instructions.
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }
}

/// Input that starts a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnInput {
    /// Fresh user text.
    User(String),
    /// Answer to a pending suspension; rejected when nothing is pending.
    Resume(Value),
}

impl TurnInput {
    /// Text appended to history as the user turn.
    pub fn into_text(self) -> String {
        match self {
            TurnInput::User(text) => text,
            TurnInput::Resume(Value::String(text)) => text,
            TurnInput::Resume(value) => value.to_string(),
        }
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Waiting for external input; carries the validated assistant turn.
    Suspended(ChatMessage),
    /// Loop exited with this assistant reply.
    Finished(ChatMessage),
}

/// Result of [`StatefulAgentLoop::run_turn`].
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub thread_id: String,
    pub outcome: TurnOutcome,
    /// State as checkpointed at the end of the turn.
    pub state: ConversationState,
}

/// Tool-calling agent loop with per-thread checkpoints.
pub struct StatefulAgentLoop {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    checkpointer: Arc<dyn Checkpointer>,
    config: LoopConfig,
}

impl StatefulAgentLoop {
    /// Create a loop with the default tool set.
    pub fn new(
        model: Arc<dyn ChatModel>,
        checkpointer: Arc<dyn Checkpointer>,
        config: LoopConfig,
    ) -> Self {
        Self::with_tools(model, ToolRegistry::with_default_tools(), checkpointer, config)
    }

    /// Create a loop with a custom tool registry.
    pub fn with_tools(
        model: Arc<dyn ChatModel>,
        tools: ToolRegistry,
        checkpointer: Arc<dyn Checkpointer>,
        config: LoopConfig,
    ) -> Self {
        Self {
            model,
            tools,
            checkpointer,
            config,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    /// Run one turn on `thread_id`, allocating a thread when none is given.
    ///
    /// # Errors
    ///
    /// `LoopError::Internal` when a suspension is malformed, a resume
    /// finds nothing pending, or the loop exits without a usable assistant
    /// reply in this turn; model and checkpoint
    /// failures propagate as their own variants.
    pub async fn run_turn(
        &self,
        thread_id: Option<&str>,
        input: TurnInput,
    ) -> Result<TurnResult, LoopError> {
        let thread_id = thread_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut checkpoint = self
            .checkpointer
            .load(&thread_id)
            .await?
            .unwrap_or_default();

        if checkpoint.next == Some(LoopNode::Act) {
            warn!(thread_id = %thread_id, "Finishing tool calls left by an interrupted turn");
            self.act(&mut checkpoint.state).await;
        }

        let resumed = !checkpoint.pending.is_empty();
        if matches!(input, TurnInput::Resume(_)) && !resumed {
            return Err(LoopError::Internal("no interrupt found".to_string()));
        }
        info!(
            thread_id = %thread_id,
            resumed,
            history = checkpoint.state.messages.len(),
            "Starting turn"
        );

        checkpoint.pending.clear();
        checkpoint.state.push(ChatMessage::user(input.into_text()));
        checkpoint.next = Some(LoopNode::Plan);
        checkpoint.step = 0;
        self.checkpointer.save(&thread_id, &checkpoint).await?;

        self.drive(&thread_id, &mut checkpoint).await?;

        let outcome = if checkpoint.next == Some(LoopNode::Suspend) {
            let pending = self.checkpointer.list_pending_suspensions(&thread_id).await?;
            TurnOutcome::Suspended(validate_suspension(&pending)?)
        } else {
            let reply = checkpoint
                .state
                .current_reply()
                .cloned()
                .ok_or_else(|| LoopError::Internal("no valid response generated".to_string()))?;
            TurnOutcome::Finished(reply)
        };

        info!(
            thread_id = %thread_id,
            steps = checkpoint.step,
            suspended = matches!(outcome, TurnOutcome::Suspended(_)),
            "Turn finished"
        );

        Ok(TurnResult {
            thread_id,
            outcome,
            state: checkpoint.state,
        })
    }

    /// Run nodes until the loop suspends or exits, saving after each one.
    async fn drive(&self, thread_id: &str, checkpoint: &mut Checkpoint) -> Result<(), LoopError> {
        while let Some(node) = checkpoint.next {
            if node == LoopNode::Plan && checkpoint.step >= self.config.max_steps {
                warn!(thread_id, max_steps = self.config.max_steps, "Step limit reached");
                checkpoint.next = None;
                self.checkpointer.save(thread_id, checkpoint).await?;
                break;
            }

            checkpoint.step += 1;
            debug!(thread_id, node = %node, step = checkpoint.step, "Running node");

            match node {
                LoopNode::Plan => {
                    checkpoint.next = self.plan(&mut checkpoint.state).await?;
                }
                LoopNode::Act => {
                    self.act(&mut checkpoint.state).await;
                    checkpoint.next = Some(LoopNode::Plan);
                }
                LoopNode::Suspend => {
                    let payload = match checkpoint.state.last_assistant() {
                        Some(message) => serde_json::to_value(message)?,
                        None => Value::Null,
                    };
                    checkpoint.pending = vec![SuspensionPoint::new(payload)];
                    self.checkpointer.save(thread_id, checkpoint).await?;
                    break;
                }
            }

            self.checkpointer.save(thread_id, checkpoint).await?;
        }
        Ok(())
    }

    /// Ask the model for the next turn and choose the following node.
    async fn plan(&self, state: &mut ConversationState) -> Result<Option<LoopNode>, LoopError> {
        state.set_system(ChatMessage::system(build_system_prompt(
            &self.config.system_prompt,
            &state.data,
        )));

        let reply = self
            .model
            .invoke(&state.messages, &self.tools.definitions())
            .await?;

        let next = if reply.has_tool_calls() {
            Some(LoopNode::Act)
        } else if self.config.suspend_on_reply {
            Some(LoopNode::Suspend)
        } else {
            None
        };
        debug!(tool_calls = reply.tool_calls.len(), next = ?next, "Model replied");

        state.push(reply);
        Ok(next)
    }

    /// Run the tool calls of the latest assistant turn in order.
    ///
    /// Tool failures become `Error: ...` tool messages for the model to see.
    async fn act(&self, state: &mut ConversationState) {
        let calls = state
            .last_message()
            .filter(|m| m.role == ChatRole::Assistant)
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();

        for call in calls {
            let result = self
                .tools
                .execute(&call.name, call.arguments.clone(), state)
                .await;

            let content = match result {
                Ok(ToolOutput::Value(text)) => text,
                Ok(ToolOutput::Update { update, message }) => {
                    state.apply(update);
                    message
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool call failed");
                    format!("Error: {}", e)
                }
            };
            debug!(tool = %call.name, "Tool call finished");
            state.push(ChatMessage::tool(call.id, call.name, content));
        }
    }
}
