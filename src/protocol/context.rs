//! Inbound request context handed to the execution bridge.

use serde::{Deserialize, Serialize};

use super::types::{Message, Task};

/// Per-request delivery options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    /// Wait for the agent to finish instead of streaming events.
    #[serde(default)]
    pub blocking: bool,
}

/// Everything the transport knows about one inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub message: Option<Message>,
    pub current_task: Option<Task>,
    pub configuration: Option<MessageSendConfiguration>,
}

impl RequestContext {
    pub fn new(message: Message) -> Self {
        Self {
            message: Some(message),
            current_task: None,
            configuration: None,
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.current_task = Some(task);
        self
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.configuration = Some(MessageSendConfiguration { blocking });
        self
    }

    /// Blocking mode is only selected when the client asked for it.
    pub fn is_blocking(&self) -> bool {
        self.configuration.as_ref().is_some_and(|c| c.blocking)
    }

    /// Bind the task the request is being executed under.
    pub fn attach_task(&mut self, task: Task) {
        self.current_task = Some(task);
    }

    pub fn task_id(&self) -> Option<String> {
        self.current_task
            .as_ref()
            .map(|t| t.id.clone())
            .or_else(|| self.message.as_ref().and_then(|m| m.task_id.clone()))
    }

    pub fn context_id(&self) -> Option<String> {
        self.current_task
            .as_ref()
            .map(|t| t.context_id.clone())
            .or_else(|| self.message.as_ref().and_then(|m| m.context_id.clone()))
    }

    /// Text the user sent in this turn; empty when there is none.
    pub fn user_input(&self) -> String {
        self.message
            .as_ref()
            .map(|m| m.text_with("\n"))
            .unwrap_or_default()
    }
}
