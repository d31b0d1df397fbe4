//! Per-thread conversation state persisted across turns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm::{ChatMessage, ChatRole};

/// History plus the structured document the model maintains.
///
/// When present, `messages[0]` is always the system message. It is
/// replaced, never appended, on every planning step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default = "empty_object")]
    pub data: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            data: empty_object(),
        }
    }
}

/// Changes a tool asks to make to the conversation state.
///
/// Each present field overwrites the state field of the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl StateUpdate {
    pub fn data(data: Value) -> Self {
        Self { data: Some(data) }
    }
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Install `system` as the first message, replacing any existing one.
    pub fn set_system(&mut self, system: ChatMessage) {
        match self.messages.first_mut() {
            Some(first) if first.is_system() => *first = system,
            _ => self.messages.insert(0, system),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Messages after the system message.
    pub fn history(&self) -> &[ChatMessage] {
        match self.messages.first() {
            Some(first) if first.is_system() => &self.messages[1..],
            _ => &self.messages,
        }
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Most recent assistant message, whatever its content.
    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Assistant)
    }

    /// Most recent assistant message with non-empty text written since the
    /// latest user turn. Replies from earlier turns are never returned.
    pub fn current_reply(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .take_while(|m| m.role != ChatRole::User)
            .filter(|m| m.role == ChatRole::Assistant)
            .find(|m| !m.content.trim().is_empty())
    }

    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(data) = update.data {
            self.data = data;
        }
    }

    /// Snapshot shaped as `{"messages": [...], "data": {...}}`.
    pub fn snapshot(&self) -> Value {
        serde_json::json!({
            "messages": self.messages,
            "data": self.data,
        })
    }
}
