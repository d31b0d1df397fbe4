//! Supervisor agent: conversational front door backed by the stateful loop.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use super::capability::{
    AgentCapability, AgentEvent, AgentEventStream, AgentResponse, TaskOutcome,
};
use super::error::{AgentError, AgentResult};
use crate::llm::ChatModel;
use crate::protocol::{
    AgentCapabilities, AgentCard, AgentSkill, Artifact, Message, Part, RequestContext, TaskState,
    TaskStatus, TaskStatusUpdateEvent, TransportProtocol,
};
use crate::scaffold::{
    Checkpointer, ConversationState, LoopConfig, StatefulAgentLoop, TurnInput, TurnOutcome,
};

/// Reply to a turn that carries no user text.
pub const GREETING: &str = "Hello! How can I help you today?";

/// Identifier the supervisor is mounted under.
pub const SUPERVISOR_ID: &str = "supervisor";

pub struct Supervisor {
    card: AgentCard,
    agent_loop: StatefulAgentLoop,
}

impl Supervisor {
    /// Create a supervisor published at `rpc_url`, running the default loop.
    pub fn new(
        rpc_url: impl Into<String>,
        model: Arc<dyn ChatModel>,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Self {
        Self::with_loop(
            rpc_url,
            StatefulAgentLoop::new(model, checkpointer, LoopConfig::default()),
        )
    }

    /// Create a supervisor around an already configured loop.
    pub fn with_loop(rpc_url: impl Into<String>, agent_loop: StatefulAgentLoop) -> Self {
        Self {
            card: Self::agent_card(rpc_url),
            agent_loop,
        }
    }

    /// The card clients discover the supervisor by.
    pub fn agent_card(rpc_url: impl Into<String>) -> AgentCard {
        AgentCard {
            name: "Supervisor".to_string(),
            description: "A supervisor agent that can oversee the execution of other agents"
                .to_string(),
            version: "1.0.0".to_string(),
            url: rpc_url.into(),
            capabilities: AgentCapabilities {
                streaming: true,
                push_notifications: false,
                state_transition_history: false,
            },
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
            skills: vec![AgentSkill {
                id: "chat".to_string(),
                name: "Chat".to_string(),
                description: "General conversation and task supervision".to_string(),
                tags: vec!["chat".to_string(), "supervision".to_string()],
            }],
            preferred_transport: TransportProtocol::JsonRpc,
        }
    }

    pub fn agent_loop(&self) -> &StatefulAgentLoop {
        &self.agent_loop
    }

    /// Snapshot of the conversation state for observability.
    pub fn state_artifact(state: &ConversationState) -> Artifact {
        Artifact::new(
            format!("agent-state-{}", uuid::Uuid::new_v4()),
            vec![Part::data(state.snapshot())],
        )
        .with_name("Agent State")
        .with_description("Conversation history and data store of the supervisor agent")
    }

    fn greeting(context: &RequestContext) -> Message {
        Message::agent_text(GREETING, context.context_id(), context.task_id())
    }

    /// Run one loop turn for a request that carries user text.
    async fn answer(
        &self,
        context: &RequestContext,
        user_input: String,
    ) -> AgentResult<AgentResponse> {
        let awaiting_input = context
            .current_task
            .as_ref()
            .is_some_and(|task| task.status.state == TaskState::InputRequired);
        let input = if awaiting_input {
            TurnInput::Resume(Value::String(user_input))
        } else {
            TurnInput::User(user_input)
        };

        let task_id = context.task_id();
        let result = self.agent_loop.run_turn(task_id.as_deref(), input).await?;

        let response = match result.outcome {
            TurnOutcome::Suspended(turn) => {
                let message = Message::agent_text(turn.content, context.context_id(), task_id);
                AgentResponse::Outcome(
                    TaskOutcome::input_required(message)
                        .with_artifacts(vec![Self::state_artifact(&result.state)]),
                )
            }
            TurnOutcome::Finished(turn) => AgentResponse::Message(Message::agent_text(
                turn.content,
                context.context_id(),
                task_id,
            )),
        };
        Ok(response)
    }
}

#[async_trait]
impl AgentCapability for Supervisor {
    fn id(&self) -> &str {
        SUPERVISOR_ID
    }

    fn card(&self) -> &AgentCard {
        &self.card
    }

    async fn invoke(&self, context: &RequestContext) -> AgentResult<AgentResponse> {
        let user_input = context.user_input();
        if user_input.is_empty() {
            debug!("No user input, answering with greeting");
            return Ok(AgentResponse::Message(Self::greeting(context)));
        }

        info!(task_id = ?context.task_id(), "Supervisor handling turn");
        self.answer(context, user_input).await
    }

    fn stream<'a>(&'a self, context: &'a RequestContext) -> AgentEventStream<'a> {
        Box::pin(async_stream::stream! {
            let user_input = context.user_input();
            if user_input.is_empty() {
                yield Ok(AgentEvent::Message(Self::greeting(context)));
                return;
            }

            if let (Some(task_id), Some(context_id)) = (context.task_id(), context.context_id()) {
                let status = TaskStatus::now(TaskState::Working, None);
                yield Ok(AgentEvent::Status(TaskStatusUpdateEvent::new(task_id, context_id, status)));
            }

            info!(task_id = ?context.task_id(), "Supervisor streaming turn");
            match self.answer(context, user_input).await {
                Ok(response) => yield Ok(response.into()),
                Err(e) => yield Err(e),
            }
        })
    }

    async fn cancel(&self, _context: &RequestContext) -> AgentResult<()> {
        Err(AgentError::Unsupported(
            "supervisor turns cannot be cancelled".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{ChatMessage, ToolDefinition};
    use crate::scaffold::MemoryCheckpointer;
    use futures::StreamExt;

    /// Model that must never be reached.
    struct UnreachableModel;

    #[async_trait]
    impl ChatModel for UnreachableModel {
        async fn invoke(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ChatMessage, LlmError> {
            panic!("model must not be called for empty input");
        }
    }

    /// Model that always answers with the same text.
    struct FixedReplyModel(&'static str);

    #[async_trait]
    impl ChatModel for FixedReplyModel {
        async fn invoke(
            &self,
            _messages: &[ChatMessage],
            _tools: &[ToolDefinition],
        ) -> Result<ChatMessage, LlmError> {
            Ok(ChatMessage::assistant(self.0))
        }
    }

    fn supervisor() -> Supervisor {
        Supervisor::new(
            "/supervisor",
            Arc::new(UnreachableModel),
            Arc::new(MemoryCheckpointer::new()),
        )
    }

    fn empty_context() -> RequestContext {
        RequestContext::new(
            Message::user_text("")
                .with_context_id("my-context-123")
                .with_task_id("my-task-456"),
        )
    }

    #[test]
    fn test_agent_card() {
        let sup = supervisor();
        let card = sup.card();
        assert_eq!(sup.id(), "supervisor");
        assert_eq!(card.name, "Supervisor");
        assert_eq!(card.url, "/supervisor");
        assert_eq!(card.version, "1.0.0");
        assert!(card.description.to_lowercase().contains("oversee"));
        assert!(card.capabilities.streaming);
        assert!(!card.capabilities.push_notifications);
        assert!(!card.capabilities.state_transition_history);
        assert_eq!(card.preferred_transport, TransportProtocol::JsonRpc);
        assert_eq!(card.default_input_modes, vec!["text/plain"]);
        assert_eq!(card.skills[0].id, "chat");
        assert_eq!(card.skills[0].tags, vec!["chat", "supervision"]);
    }

    #[tokio::test]
    async fn test_invoke_greets_on_empty_input() {
        let response = supervisor().invoke(&empty_context()).await.unwrap();
        match response {
            AgentResponse::Message(message) => {
                assert_eq!(message.text(), GREETING);
                assert_eq!(message.context_id.as_deref(), Some("my-context-123"));
                assert_eq!(message.task_id.as_deref(), Some("my-task-456"));
            }
            other => panic!("expected greeting message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_greets_on_empty_input() {
        let sup = supervisor();
        let context = empty_context();
        let events: Vec<_> = sup.stream(&context).collect().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            Ok(AgentEvent::Message(message)) => assert_eq!(message.text(), GREETING),
            other => panic!("expected greeting, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_whitespace_input_reaches_the_loop() {
        let sup = Supervisor::new(
            "/supervisor",
            Arc::new(FixedReplyModel("What would you like?")),
            Arc::new(MemoryCheckpointer::new()),
        );
        let context = RequestContext::new(
            Message::user_text("   ")
                .with_context_id("my-context-123")
                .with_task_id("my-task-456"),
        );

        match sup.invoke(&context).await.unwrap() {
            AgentResponse::Outcome(outcome) => {
                assert_eq!(outcome.status.state, TaskState::InputRequired);
                let message = outcome.status.message.expect("reply message");
                assert_eq!(message.text(), "What would you like?");
            }
            other => panic!("expected loop outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_is_unsupported() {
        let err = supervisor().cancel(&empty_context()).await.unwrap_err();
        assert!(matches!(err, AgentError::Unsupported(_)));
    }

    #[test]
    fn test_state_artifact_shape() {
        let mut state = ConversationState::new().with_data(serde_json::json!({"key": "value"}));
        state.push(ChatMessage::user("Hello"));

        let artifact = Supervisor::state_artifact(&state);
        assert!(artifact.artifact_id.starts_with("agent-state-"));
        assert_eq!(artifact.name.as_deref(), Some("Agent State"));
        assert!(artifact.description.is_some());
        assert_eq!(artifact.parts.len(), 1);

        match &artifact.parts[0] {
            Part::Data(part) => {
                assert_eq!(part.data["data"]["key"], "value");
                assert_eq!(part.data["messages"][0]["role"], "user");
                assert_eq!(part.data["messages"][0]["content"], "Hello");
            }
            other => panic!("expected data part, got {:?}", other),
        }
    }
}
