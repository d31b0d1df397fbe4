//! Drives a task's lifecycle from whatever an agent produces.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::ExecutorError;
use crate::agents::{AgentCapability, AgentError, AgentEvent, AgentResponse, TaskOutcome};
use crate::protocol::{Message, RequestContext, Task, TaskState};
use crate::tasks::{ArtifactUpdate, EventQueue, StatusSink, TaskEvent, TaskUpdater};

/// Protocol-agnostic adapter between an agent and the task store.
///
/// For every `execute` call the task reaches at most one terminal status;
/// non-terminal status and artifact commits may precede it. Agent failures
/// are never propagated: they become a `failed` status carrying the error
/// text.
pub struct TaskLifecycleBridge {
    agent: Arc<dyn AgentCapability>,
}

impl TaskLifecycleBridge {
    pub fn new(agent: Arc<dyn AgentCapability>) -> Self {
        Self { agent }
    }

    pub fn agent(&self) -> &Arc<dyn AgentCapability> {
        &self.agent
    }

    /// Run the agent for one inbound request and commit the results.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when there is neither a current task nor an
    /// inbound message, and `Sink` when the event queue refuses a commit.
    pub async fn execute(
        &self,
        context: &mut RequestContext,
        queue: &EventQueue,
    ) -> Result<(), ExecutorError> {
        let task = resolve_task(context, queue)?;
        let updater = TaskUpdater::new(queue.clone(), task.id.clone(), task.context_id.clone());
        let mut commits = Committer::new(&updater, &task);

        if context.is_blocking() {
            info!(task_id = %task.id, agent = self.agent.id(), "Invoking agent");
            match self.agent.invoke(context).await {
                Ok(response) => commits.apply(response.into()).await?,
                Err(err) => commits.fail_with(&err).await?,
            }
        } else {
            info!(task_id = %task.id, agent = self.agent.id(), "Streaming agent");
            let mut events = self.agent.stream(context);
            while let Some(item) = events.next().await {
                match item {
                    Ok(event) => commits.apply(event).await?,
                    Err(err) => {
                        commits.fail_with(&err).await?;
                        break;
                    }
                }
            }
        }

        debug!(task_id = %task.id, terminal = commits.terminal, "Execution finished");
        Ok(())
    }

    /// Cancellation goes through a dedicated path, not through the bridge.
    pub async fn cancel(
        &self,
        _context: &RequestContext,
        _queue: &EventQueue,
    ) -> Result<(), ExecutorError> {
        Err(ExecutorError::Unsupported(
            "cancel must use the dedicated cancellation path".to_string(),
        ))
    }
}

/// Reuse the current task or create one anchored to the inbound message.
fn resolve_task(context: &mut RequestContext, queue: &EventQueue) -> Result<Task, ExecutorError> {
    if let Some(task) = &context.current_task {
        return Ok(task.clone());
    }

    let message = context.message.as_ref().ok_or_else(|| {
        ExecutorError::InvalidState("Cannot create task: no message in context".to_string())
    })?;
    let task = Task::from_message(message);
    debug!(task_id = %task.id, context_id = %task.context_id, "Created task");
    queue.enqueue(TaskEvent::Task(task.clone()))?;
    context.attach_task(task.clone());
    Ok(task)
}

/// Applies agent output to a sink, enforcing a single terminal commit.
struct Committer<'a> {
    sink: &'a dyn StatusSink,
    task_id: String,
    context_id: String,
    terminal: bool,
}

impl<'a> Committer<'a> {
    fn new(sink: &'a dyn StatusSink, task: &Task) -> Self {
        Self {
            sink,
            task_id: task.id.clone(),
            context_id: task.context_id.clone(),
            terminal: false,
        }
    }

    async fn apply(&mut self, event: AgentEvent) -> Result<(), ExecutorError> {
        if self.terminal {
            warn!(task_id = %self.task_id, "Dropping agent event after terminal status");
            return Ok(());
        }

        match event {
            AgentEvent::Message(message) => {
                self.sink.complete(Some(message)).await?;
                self.terminal = true;
            }
            AgentEvent::Outcome(outcome) => self.apply_outcome(outcome).await?,
            AgentEvent::Status(event) => {
                let state = event.status.state;
                self.sink.update_status(state, event.status.message).await?;
                self.terminal = state.is_terminal();
            }
            AgentEvent::Artifact(event) => {
                self.sink
                    .add_artifact(ArtifactUpdate::chunk(
                        event.artifact,
                        event.append,
                        event.last_chunk,
                    ))
                    .await?;
            }
        }
        Ok(())
    }

    async fn apply_outcome(&mut self, outcome: TaskOutcome) -> Result<(), ExecutorError> {
        for artifact in outcome.artifacts.unwrap_or_default() {
            self.sink
                .add_artifact(ArtifactUpdate::from_artifact(artifact))
                .await?;
        }

        let message = outcome.status.message;
        match outcome.status.state {
            TaskState::Completed => self.sink.complete(message).await?,
            TaskState::Failed => self.sink.fail(message).await?,
            TaskState::Canceled => self.sink.cancel(message).await?,
            TaskState::Rejected => self.sink.reject(message).await?,
            other => {
                self.sink.update_status(other, message).await?;
                return Ok(());
            }
        }
        self.terminal = true;
        Ok(())
    }

    async fn fail_with(&mut self, err: &AgentError) -> Result<(), ExecutorError> {
        if self.terminal {
            warn!(task_id = %self.task_id, error = %err, "Agent failed after terminal status");
            return Ok(());
        }

        warn!(task_id = %self.task_id, error = %err, "Agent failed, marking task as failed");
        let message = Message::agent_text(
            err.to_string(),
            Some(self.context_id.clone()),
            Some(self.task_id.clone()),
        );
        self.sink.fail(Some(message)).await?;
        self.terminal = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentEventStream, AgentResult};
    use crate::protocol::{AgentCapabilities, AgentCard, TransportProtocol};
    use async_trait::async_trait;

    struct EchoAgent {
        card: AgentCard,
    }

    impl EchoAgent {
        fn new() -> Self {
            Self {
                card: AgentCard {
                    name: "Echo".to_string(),
                    description: "echoes".to_string(),
                    version: "1.0.0".to_string(),
                    url: "/echo".to_string(),
                    capabilities: AgentCapabilities::default(),
                    default_input_modes: vec![],
                    default_output_modes: vec![],
                    skills: vec![],
                    preferred_transport: TransportProtocol::JsonRpc,
                },
            }
        }
    }

    #[async_trait]
    impl AgentCapability for EchoAgent {
        fn id(&self) -> &str {
            "echo"
        }

        fn card(&self) -> &AgentCard {
            &self.card
        }

        async fn invoke(&self, context: &RequestContext) -> AgentResult<AgentResponse> {
            Ok(AgentResponse::Message(Message::agent_text(
                context.user_input(),
                context.context_id(),
                context.task_id(),
            )))
        }

        fn stream<'a>(&'a self, _context: &'a RequestContext) -> AgentEventStream<'a> {
            Box::pin(futures::stream::empty())
        }

        async fn cancel(&self, _context: &RequestContext) -> AgentResult<()> {
            Err(AgentError::Unsupported("cancel".to_string()))
        }
    }

    #[tokio::test]
    async fn test_execute_without_message_or_task_is_invalid_state() {
        let bridge = TaskLifecycleBridge::new(Arc::new(EchoAgent::new()));
        let (queue, mut rx) = EventQueue::channel();
        let mut context = RequestContext::default();

        let err = bridge.execute(&mut context, &queue).await.unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidState(_)));
        assert!(err.to_string().contains("no message"));
        assert!(rx.drain().is_empty());
    }

    #[tokio::test]
    async fn test_execute_creates_task_and_attaches_it() {
        let bridge = TaskLifecycleBridge::new(Arc::new(EchoAgent::new()));
        let (queue, mut rx) = EventQueue::channel();
        let mut context = RequestContext::new(Message::user_text("ping")).blocking(true);

        bridge.execute(&mut context, &queue).await.unwrap();

        let events = rx.drain();
        assert_eq!(events.len(), 2);
        let task_id = match &events[0] {
            TaskEvent::Task(task) => task.id.clone(),
            other => panic!("expected task event, got {:?}", other),
        };
        assert_eq!(context.task_id(), Some(task_id.clone()));
        match &events[1] {
            TaskEvent::StatusUpdate(ev) => {
                assert_eq!(ev.task_id, task_id);
                assert_eq!(ev.status.state, TaskState::Completed);
                let message = ev.status.message.as_ref().unwrap();
                assert_eq!(message.text(), "ping");
                assert_eq!(message.task_id.as_deref(), Some(task_id.as_str()));
            }
            other => panic!("expected status event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_is_unsupported() {
        let bridge = TaskLifecycleBridge::new(Arc::new(EchoAgent::new()));
        let (queue, _rx) = EventQueue::channel();
        let err = bridge
            .cancel(&RequestContext::default(), &queue)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Unsupported(_)));
    }
}
