//! Ordered event channel between the bridge and the task store.

use serde::Serialize;
use tokio::sync::mpsc;

use super::SinkError;
use crate::protocol::{Task, TaskArtifactUpdateEvent, TaskStatusUpdateEvent};

/// One committed change to a task, in commit order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskEvent {
    Task(Task),
    StatusUpdate(TaskStatusUpdateEvent),
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

/// Producer side of the task event channel.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

/// Consumer side of the task event channel.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<TaskEvent>,
}

impl EventQueue {
    /// Create a connected queue/receiver pair.
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, EventReceiver { rx })
    }

    pub fn enqueue(&self, event: TaskEvent) -> Result<(), SinkError> {
        self.tx.send(event).map_err(|_| SinkError::QueueClosed)
    }
}

impl EventReceiver {
    /// Wait for the next event; `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        self.rx.recv().await
    }

    /// Take every event that is already buffered without waiting.
    pub fn drain(&mut self) -> Vec<TaskEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
