//! Status sink used by the bridge to commit task transitions.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::queue::{EventQueue, TaskEvent};
use super::SinkError;
use crate::protocol::{
    Artifact, Message, Part, TaskArtifactUpdateEvent, TaskState, TaskStatus,
    TaskStatusUpdateEvent,
};

/// Arguments of an artifact add/append commit.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactUpdate {
    pub parts: Vec<Part>,
    pub artifact_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<Value>,
    pub append: Option<bool>,
    pub last_chunk: Option<bool>,
    pub extensions: Option<Vec<String>>,
}

impl ArtifactUpdate {
    /// Full (non-incremental) add of an artifact.
    pub fn from_artifact(artifact: Artifact) -> Self {
        Self {
            parts: artifact.parts,
            artifact_id: artifact.artifact_id,
            name: artifact.name,
            description: artifact.description,
            metadata: artifact.metadata,
            append: None,
            last_chunk: None,
            extensions: artifact.extensions,
        }
    }

    /// Incremental chunk carrying its own append/last-chunk flags.
    pub fn chunk(artifact: Artifact, append: Option<bool>, last_chunk: Option<bool>) -> Self {
        Self {
            append,
            last_chunk,
            ..Self::from_artifact(artifact)
        }
    }

    fn into_artifact(self) -> (Artifact, Option<bool>, Option<bool>) {
        let artifact = Artifact {
            artifact_id: self.artifact_id,
            name: self.name,
            description: self.description,
            parts: self.parts,
            metadata: self.metadata,
            extensions: self.extensions,
        };
        (artifact, self.append, self.last_chunk)
    }
}

/// Transition operations the task store accepts for one task.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Add an artifact, or append to one when `append` is set.
    async fn add_artifact(&self, update: ArtifactUpdate) -> Result<(), SinkError>;

    /// Record a status change; terminal states end the task.
    async fn update_status(
        &self,
        state: TaskState,
        message: Option<Message>,
    ) -> Result<(), SinkError>;

    async fn complete(&self, message: Option<Message>) -> Result<(), SinkError> {
        self.update_status(TaskState::Completed, message).await
    }

    async fn fail(&self, message: Option<Message>) -> Result<(), SinkError> {
        self.update_status(TaskState::Failed, message).await
    }

    async fn cancel(&self, message: Option<Message>) -> Result<(), SinkError> {
        self.update_status(TaskState::Canceled, message).await
    }

    async fn reject(&self, message: Option<Message>) -> Result<(), SinkError> {
        self.update_status(TaskState::Rejected, message).await
    }
}

/// Publishes transitions for one task onto an [`EventQueue`].
#[derive(Debug)]
pub struct TaskUpdater {
    queue: EventQueue,
    task_id: String,
    context_id: String,
    terminal: AtomicBool,
}

impl TaskUpdater {
    pub fn new(queue: EventQueue, task_id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            queue,
            task_id: task_id.into(),
            context_id: context_id.into(),
            terminal: AtomicBool::new(false),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Whether a terminal status has already been committed.
    pub fn is_terminal(&self) -> bool {
        self.terminal.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSink for TaskUpdater {
    async fn add_artifact(&self, update: ArtifactUpdate) -> Result<(), SinkError> {
        let (artifact, append, last_chunk) = update.into_artifact();
        tracing::debug!(
            task_id = %self.task_id,
            artifact_id = %artifact.artifact_id,
            append = ?append,
            "Committing artifact"
        );
        self.queue
            .enqueue(TaskEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
                task_id: self.task_id.clone(),
                context_id: self.context_id.clone(),
                artifact,
                append,
                last_chunk,
            }))
    }

    async fn update_status(
        &self,
        state: TaskState,
        message: Option<Message>,
    ) -> Result<(), SinkError> {
        if state.is_terminal() {
            if self.terminal.swap(true, Ordering::SeqCst) {
                return Err(SinkError::AlreadyTerminal {
                    task_id: self.task_id.clone(),
                });
            }
        } else if self.is_terminal() {
            return Err(SinkError::AlreadyTerminal {
                task_id: self.task_id.clone(),
            });
        }

        tracing::debug!(task_id = %self.task_id, state = %state, "Committing status");
        self.queue.enqueue(TaskEvent::StatusUpdate(TaskStatusUpdateEvent::new(
            self.task_id.clone(),
            self.context_id.clone(),
            TaskStatus::now(state, message),
        )))
    }
}
