//! Validation of the loop's pending suspension points.

use super::agent_loop::LoopError;
use super::checkpoint::SuspensionPoint;
use crate::llm::{ChatMessage, ChatRole};

/// Check that a suspended thread has exactly one well-formed suspension
/// point and return its assistant turn.
///
/// # Errors
///
/// `LoopError::Internal` with "no interrupt found", "multiple interrupts,
/// only one allowed" or "interrupt payload has wrong shape".
pub fn validate_suspension(points: &[SuspensionPoint]) -> Result<ChatMessage, LoopError> {
    let point = match points {
        [] => return Err(LoopError::Internal("no interrupt found".to_string())),
        [point] => point,
        _ => {
            return Err(LoopError::Internal(
                "multiple interrupts, only one allowed".to_string(),
            ))
        }
    };

    let wrong_shape = || LoopError::Internal("interrupt payload has wrong shape".to_string());
    let message: ChatMessage =
        serde_json::from_value(point.payload.clone()).map_err(|_| wrong_shape())?;
    if message.role != ChatRole::Assistant {
        return Err(wrong_shape());
    }
    Ok(message)
}
