//! Integration tests for the task lifecycle bridge.
//!
//! A scripted agent stands in for a real one so every way an agent can end
//! a turn is checked against the task events the bridge commits.

use std::sync::Arc;

use agent_workers::agents::{
    AgentCapability, AgentError, AgentEvent, AgentEventStream, AgentResponse, AgentResult,
    TaskOutcome,
};
use agent_workers::executor::{ExecutorError, TaskLifecycleBridge};
use agent_workers::protocol::{
    AgentCapabilities, AgentCard, Artifact, Message, Part, RequestContext, Task,
    TaskArtifactUpdateEvent, TaskState, TaskStatus, TaskStatusUpdateEvent, TransportProtocol,
};
use agent_workers::tasks::{EventQueue, TaskEvent};
use async_trait::async_trait;

/// One element an agent's stream yields.
#[derive(Clone)]
enum Step {
    Event(AgentEvent),
    Fail(String),
}

/// Agent that replays a fixed response or event script.
struct ScriptedAgent {
    card: AgentCard,
    response: Result<AgentResponse, String>,
    steps: Vec<Step>,
}

impl ScriptedAgent {
    fn card() -> AgentCard {
        AgentCard {
            name: "Scripted".to_string(),
            description: "Replays a fixed script".to_string(),
            version: "1.0.0".to_string(),
            url: "/scripted".to_string(),
            capabilities: AgentCapabilities {
                streaming: true,
                ..Default::default()
            },
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
            skills: vec![],
            preferred_transport: TransportProtocol::JsonRpc,
        }
    }

    fn responding(response: AgentResponse) -> Self {
        Self {
            card: Self::card(),
            response: Ok(response),
            steps: vec![],
        }
    }

    fn failing(error: &str) -> Self {
        Self {
            card: Self::card(),
            response: Err(error.to_string()),
            steps: vec![],
        }
    }

    fn streaming(steps: Vec<Step>) -> Self {
        Self {
            card: Self::card(),
            response: Err("invoke not scripted".to_string()),
            steps,
        }
    }
}

#[async_trait]
impl AgentCapability for ScriptedAgent {
    fn id(&self) -> &str {
        "scripted"
    }

    fn card(&self) -> &AgentCard {
        &self.card
    }

    async fn invoke(&self, _context: &RequestContext) -> AgentResult<AgentResponse> {
        self.response.clone().map_err(AgentError::Failed)
    }

    fn stream<'a>(&'a self, _context: &'a RequestContext) -> AgentEventStream<'a> {
        Box::pin(futures::stream::iter(self.steps.iter().map(|step| match step {
            Step::Event(event) => Ok(event.clone()),
            Step::Fail(error) => Err(AgentError::Failed(error.clone())),
        })))
    }

    async fn cancel(&self, _context: &RequestContext) -> AgentResult<()> {
        Err(AgentError::Unsupported("cancel".to_string()))
    }
}

fn agent_text(text: &str) -> Message {
    Message::agent_text(text, None, None)
}

fn artifact(id: &str) -> Artifact {
    Artifact::new(id, vec![Part::text(format!("content of {}", id))])
}

/// Run one request through the bridge and return the committed events.
async fn run(agent: ScriptedAgent, mut context: RequestContext) -> Vec<TaskEvent> {
    let bridge = TaskLifecycleBridge::new(Arc::new(agent));
    let (queue, mut rx) = EventQueue::channel();
    bridge
        .execute(&mut context, &queue)
        .await
        .expect("execute should succeed");
    rx.drain()
}

fn blocking(text: &str) -> RequestContext {
    RequestContext::new(Message::user_text(text)).blocking(true)
}

fn streaming(text: &str) -> RequestContext {
    RequestContext::new(Message::user_text(text))
}

fn status(event: &TaskEvent) -> &TaskStatusUpdateEvent {
    match event {
        TaskEvent::StatusUpdate(update) => update,
        other => panic!("expected status update, got {:?}", other),
    }
}

fn artifact_update(event: &TaskEvent) -> &TaskArtifactUpdateEvent {
    match event {
        TaskEvent::ArtifactUpdate(update) => update,
        other => panic!("expected artifact update, got {:?}", other),
    }
}

fn status_text(update: &TaskStatusUpdateEvent) -> String {
    update
        .status
        .message
        .as_ref()
        .map(|m| m.text())
        .unwrap_or_default()
}

fn terminal_count(events: &[TaskEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, TaskEvent::StatusUpdate(u) if u.status.state.is_terminal()))
        .count()
}

#[tokio::test]
async fn test_new_task_is_enqueued_before_any_status() {
    let events = run(
        ScriptedAgent::responding(AgentResponse::Message(agent_text("hi"))),
        blocking("hello"),
    )
    .await;

    assert_eq!(events.len(), 2);
    match &events[0] {
        TaskEvent::Task(task) => {
            assert_eq!(task.status.state, TaskState::Submitted);
            assert_eq!(task.history[0].text(), "hello");
        }
        other => panic!("expected task event, got {:?}", other),
    }
    let done = status(&events[1]);
    assert_eq!(done.status.state, TaskState::Completed);
    assert!(done.is_final);
    assert_eq!(status_text(done), "hi");
}

#[tokio::test]
async fn test_existing_task_is_not_recreated() {
    let message = Message::user_text("again").with_task_id("t-1").with_context_id("c-1");
    let context = RequestContext::new(message.clone())
        .with_task(Task::from_message(&message))
        .blocking(true);

    let events = run(
        ScriptedAgent::responding(AgentResponse::Message(agent_text("ok"))),
        context,
    )
    .await;

    assert_eq!(events.len(), 1);
    let done = status(&events[0]);
    assert_eq!(done.task_id, "t-1");
    assert_eq!(done.context_id, "c-1");
    assert_eq!(done.status.state, TaskState::Completed);
}

#[tokio::test]
async fn test_terminal_outcomes_map_to_matching_status() {
    for state in [
        TaskState::Completed,
        TaskState::Failed,
        TaskState::Canceled,
        TaskState::Rejected,
    ] {
        let outcome = TaskOutcome::new(state, Some(agent_text("final word")));
        let events = run(
            ScriptedAgent::responding(AgentResponse::Outcome(outcome)),
            blocking("go"),
        )
        .await;

        assert_eq!(events.len(), 2, "state {}", state);
        let update = status(&events[1]);
        assert_eq!(update.status.state, state);
        assert!(update.is_final);
        assert_eq!(status_text(update), "final word");
    }
}

#[tokio::test]
async fn test_input_required_is_not_terminal() {
    let outcome = TaskOutcome::input_required(agent_text("Which city?"));
    let events = run(
        ScriptedAgent::responding(AgentResponse::Outcome(outcome)),
        blocking("book a flight"),
    )
    .await;

    assert_eq!(events.len(), 2);
    let update = status(&events[1]);
    assert_eq!(update.status.state, TaskState::InputRequired);
    assert!(!update.is_final);
    assert_eq!(status_text(update), "Which city?");
    assert_eq!(terminal_count(&events), 0);
}

#[tokio::test]
async fn test_outcome_artifacts_precede_status_in_order() {
    let outcome = TaskOutcome::new(TaskState::Completed, None)
        .with_artifacts(vec![artifact("first"), artifact("second")]);
    let events = run(
        ScriptedAgent::responding(AgentResponse::Outcome(outcome)),
        blocking("report"),
    )
    .await;

    assert_eq!(events.len(), 4);
    assert_eq!(artifact_update(&events[1]).artifact.artifact_id, "first");
    assert_eq!(artifact_update(&events[2]).artifact.artifact_id, "second");
    assert!(artifact_update(&events[1]).append.is_none());
    assert_eq!(status(&events[3]).status.state, TaskState::Completed);
}

#[tokio::test]
async fn test_agent_error_fails_task_with_error_text() {
    let events = run(ScriptedAgent::failing("model exploded"), blocking("hi")).await;

    assert_eq!(events.len(), 2);
    let update = status(&events[1]);
    assert_eq!(update.status.state, TaskState::Failed);
    assert!(update.is_final);
    assert!(status_text(update).contains("model exploded"));

    let message = update.status.message.as_ref().unwrap();
    assert_eq!(message.task_id.as_deref(), Some(update.task_id.as_str()));
    assert_eq!(message.context_id.as_deref(), Some(update.context_id.as_str()));
}

#[tokio::test]
async fn test_stream_events_are_committed_in_order() {
    let working = TaskStatusUpdateEvent::new("t", "c", TaskStatus::now(TaskState::Working, None));
    let chunk = TaskArtifactUpdateEvent {
        task_id: "t".to_string(),
        context_id: "c".to_string(),
        artifact: artifact("log"),
        append: Some(true),
        last_chunk: Some(false),
    };
    let events = run(
        ScriptedAgent::streaming(vec![
            Step::Event(AgentEvent::Status(working)),
            Step::Event(AgentEvent::Artifact(chunk)),
            Step::Event(AgentEvent::Outcome(TaskOutcome::new(
                TaskState::Completed,
                Some(agent_text("all done")),
            ))),
        ]),
        streaming("work"),
    )
    .await;

    assert_eq!(events.len(), 4);
    let task_id = match &events[0] {
        TaskEvent::Task(task) => task.id.clone(),
        other => panic!("expected task event, got {:?}", other),
    };

    let first = status(&events[1]);
    assert_eq!(first.status.state, TaskState::Working);
    assert!(!first.is_final);
    assert_eq!(first.task_id, task_id);

    let appended = artifact_update(&events[2]);
    assert_eq!(appended.artifact.artifact_id, "log");
    assert_eq!(appended.append, Some(true));
    assert_eq!(appended.last_chunk, Some(false));
    assert_eq!(appended.task_id, task_id);

    let last = status(&events[3]);
    assert_eq!(last.status.state, TaskState::Completed);
    assert_eq!(status_text(last), "all done");
}

#[tokio::test]
async fn test_stream_error_fails_task_and_stops() {
    let working = TaskStatusUpdateEvent::new("t", "c", TaskStatus::now(TaskState::Working, None));
    let events = run(
        ScriptedAgent::streaming(vec![
            Step::Event(AgentEvent::Status(working)),
            Step::Fail("stream broke".to_string()),
            Step::Event(AgentEvent::Message(agent_text("never seen"))),
        ]),
        streaming("work"),
    )
    .await;

    assert_eq!(events.len(), 3);
    assert_eq!(status(&events[1]).status.state, TaskState::Working);
    let failed = status(&events[2]);
    assert_eq!(failed.status.state, TaskState::Failed);
    assert!(status_text(failed).contains("stream broke"));
}

#[tokio::test]
async fn test_events_after_terminal_are_dropped() {
    let working = TaskStatusUpdateEvent::new("t", "c", TaskStatus::now(TaskState::Working, None));
    let chunk = TaskArtifactUpdateEvent {
        task_id: "t".to_string(),
        context_id: "c".to_string(),
        artifact: artifact("late"),
        append: None,
        last_chunk: None,
    };
    let events = run(
        ScriptedAgent::streaming(vec![
            Step::Event(AgentEvent::Message(agent_text("done"))),
            Step::Event(AgentEvent::Status(working)),
            Step::Event(AgentEvent::Artifact(chunk)),
            Step::Fail("too late".to_string()),
        ]),
        streaming("work"),
    )
    .await;

    assert_eq!(events.len(), 2);
    let done = status(&events[1]);
    assert_eq!(done.status.state, TaskState::Completed);
    assert_eq!(terminal_count(&events), 1);
}

#[tokio::test]
async fn test_terminal_status_event_ends_stream_commits() {
    let canceled = TaskStatusUpdateEvent::new("t", "c", TaskStatus::now(TaskState::Canceled, None));
    let events = run(
        ScriptedAgent::streaming(vec![
            Step::Event(AgentEvent::Status(canceled)),
            Step::Event(AgentEvent::Message(agent_text("ignored"))),
        ]),
        streaming("work"),
    )
    .await;

    assert_eq!(events.len(), 2);
    assert_eq!(status(&events[1]).status.state, TaskState::Canceled);
}

#[tokio::test]
async fn test_missing_message_and_task_is_invalid_state() {
    let bridge = TaskLifecycleBridge::new(Arc::new(ScriptedAgent::failing("unused")));
    let (queue, mut rx) = EventQueue::channel();
    let mut context = RequestContext::default();

    let err = bridge.execute(&mut context, &queue).await.unwrap_err();
    assert!(matches!(err, ExecutorError::InvalidState(_)));
    assert!(rx.drain().is_empty());
}
