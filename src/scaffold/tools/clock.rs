//! Current time tool.

use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Value};

use super::{Tool, ToolError, ToolOutput};
use crate::scaffold::state::ConversationState;

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current local time in RFC 3339 format."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value, _state: &ConversationState) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::value(Local::now().to_rfc3339()))
    }
}
