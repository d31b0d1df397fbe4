//! Agent capability contract and the agents that implement it.

pub mod capability;
pub mod error;
pub mod supervisor;

pub use capability::{AgentCapability, AgentEvent, AgentEventStream, AgentResponse, TaskOutcome};
pub use error::{AgentError, AgentResult};
pub use supervisor::{Supervisor, GREETING};
