//! RFC 6902 JSON Patch updates to the agent's data document.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{string_arg, Tool, ToolError, ToolOutput};
use crate::scaffold::state::{ConversationState, StateUpdate};

/// Apply `patch_document` (a JSON array of operations) to a copy of `data`.
///
/// `data` is left untouched when any operation fails.
///
/// # Errors
///
/// `ToolError::InvalidArgument` if the document is not a valid patch, or if
/// an operation cannot be applied (missing path, failed `test`, ...).
pub fn apply_patch(patch_document: &str, data: &Value) -> Result<Value, ToolError> {
    let patch: json_patch::Patch = serde_json::from_str(patch_document).map_err(|e| {
        ToolError::InvalidArgument(format!("Invalid JSON in patch document: {}", e))
    })?;

    let mut patched = data.clone();
    json_patch::patch(&mut patched, &patch)
        .map_err(|e| ToolError::InvalidArgument(format!("JSON Patch error: {}", e)))?;
    Ok(patched)
}

/// Tool exposing [`apply_patch`] as a state update.
pub struct PatchTool;

#[async_trait]
impl Tool for PatchTool {
    fn name(&self) -> &str {
        "jsonpatch_update"
    }

    fn description(&self) -> &str {
        "Update the structured data store with a JSON Patch (RFC 6902) document: a JSON array \
         of operations such as {\"op\": \"add\", \"path\": \"/name\", \"value\": \"John\"}. \
         Supported ops: add, remove, replace, move, copy, test."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "patch": {
                    "type": "string",
                    "description": "JSON array of RFC 6902 patch operations"
                }
            },
            "required": ["patch"]
        })
    }

    async fn execute(&self, args: Value, state: &ConversationState) -> Result<ToolOutput, ToolError> {
        let document = string_arg(&args, "patch")?;
        let data = apply_patch(document, &state.data)?;
        Ok(ToolOutput::Update {
            update: StateUpdate::data(data),
            message: "Successfully applied JSON patch to data".to_string(),
        })
    }
}
