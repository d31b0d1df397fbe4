//! Task event plumbing between the execution bridge and the task store.
//!
//! The bridge never mutates a task directly. It commits transitions through
//! a [`StatusSink`]; the stock [`TaskUpdater`] turns them into ordered
//! [`TaskEvent`]s on an [`EventQueue`] that the transport drains.

pub mod queue;
pub mod updater;

pub use queue::{EventQueue, EventReceiver, TaskEvent};
pub use updater::{ArtifactUpdate, StatusSink, TaskUpdater};

use thiserror::Error;

/// Errors raised while committing task transitions.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("Event queue is closed")]
    QueueClosed,

    #[error("Task '{task_id}' is already in a terminal state")]
    AlreadyTerminal { task_id: String },
}
