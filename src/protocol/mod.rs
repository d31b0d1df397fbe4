//! Value types of the task-oriented agent protocol.
//!
//! The transport layer owns request parsing and task persistence; this
//! module only mirrors the shapes it exchanges with the bridge and agents.

pub mod card;
pub mod context;
pub mod types;

pub use card::{AgentCapabilities, AgentCard, AgentSkill, TransportProtocol};
pub use context::{MessageSendConfiguration, RequestContext};
pub use types::{
    Artifact, DataPart, Message, Part, Role, Task, TaskArtifactUpdateEvent, TaskState,
    TaskStatus, TaskStatusUpdateEvent, TextPart,
};
