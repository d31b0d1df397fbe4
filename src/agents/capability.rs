//! The contract every agent implementation satisfies.
//!
//! An agent answers a turn either all at once ([`AgentCapability::invoke`])
//! or as an ordered stream of events ([`AgentCapability::stream`]). It never
//! touches the task record itself: it returns a [`TaskOutcome`] describing
//! the status and artifacts it wants, and the execution bridge commits them.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::error::AgentResult;
use crate::protocol::{
    AgentCard, Artifact, Message, RequestContext, TaskArtifactUpdateEvent, TaskState, TaskStatus,
    TaskStatusUpdateEvent,
};

/// Status and artifacts an agent wants committed to its task.
///
/// Returned instead of a live task so agents cannot alter the immutable
/// parts of the task (id, context, history).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    pub artifacts: Option<Vec<Artifact>>,
}

impl TaskOutcome {
    pub fn new(state: TaskState, message: Option<Message>) -> Self {
        Self {
            status: TaskStatus::new(state, message),
            artifacts: None,
        }
    }

    /// Agent needs more input from the user before it can continue.
    pub fn input_required(message: Message) -> Self {
        Self::new(TaskState::InputRequired, Some(message))
    }

    pub fn with_artifacts(mut self, artifacts: Vec<Artifact>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn state(&self) -> TaskState {
        self.status.state
    }
}

/// Result of a blocking invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResponse {
    Message(Message),
    Outcome(TaskOutcome),
}

/// One element of an agent's event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Message(Message),
    Outcome(TaskOutcome),
    Status(TaskStatusUpdateEvent),
    Artifact(TaskArtifactUpdateEvent),
}

impl From<AgentResponse> for AgentEvent {
    fn from(response: AgentResponse) -> Self {
        match response {
            AgentResponse::Message(message) => AgentEvent::Message(message),
            AgentResponse::Outcome(outcome) => AgentEvent::Outcome(outcome),
        }
    }
}

/// Finite, ordered event stream for one turn. Errors end the stream.
pub type AgentEventStream<'a> = BoxStream<'a, AgentResult<AgentEvent>>;

/// Invoke/stream/cancel contract between the bridge and an agent.
#[async_trait]
pub trait AgentCapability: Send + Sync {
    /// Stable identifier the agent is mounted under.
    fn id(&self) -> &str;

    /// Card published to clients.
    fn card(&self) -> &AgentCard;

    /// Run one turn to completion. Never called concurrently for one task.
    async fn invoke(&self, context: &RequestContext) -> AgentResult<AgentResponse>;

    /// Run one turn, yielding events in the order they should be committed.
    fn stream<'a>(&'a self, context: &'a RequestContext) -> AgentEventStream<'a>;

    /// Best-effort cancellation; agents without one return `Unsupported`.
    async fn cancel(&self, context: &RequestContext) -> AgentResult<()>;
}
