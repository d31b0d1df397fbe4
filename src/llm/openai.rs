//! OpenAI-compatible chat completions client.
//!
//! Works against any `/chat/completions` endpoint that speaks the OpenAI
//! function-calling dialect (OpenAI itself, Ollama, LiteLLM proxies).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::messages::{ChatMessage, ChatModel, ChatRole, ToolCall, ToolDefinition};
use crate::error::LlmError;
use crate::settings::Settings;

/// Request timeout for a single completion.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Chat model backed by an OpenAI-compatible HTTP API.
pub struct OpenAiChatModel {
    /// Base URL for the API, without the `/chat/completions` suffix.
    api_base: String,
    /// Optional API key sent as a bearer token.
    api_key: Option<String>,
    /// Model identifier sent with every request.
    model: String,
    http_client: Client,
}

impl OpenAiChatModel {
    /// Create a new client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingApiBase` for an empty base URL and
    /// `LlmError::RequestFailed` if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_base = api_base.into();
        if api_base.trim().is_empty() {
            return Err(LlmError::MissingApiBase);
        }

        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::RequestFailed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
            http_client,
        })
    }

    /// Create a client from resolved settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, LlmError> {
        Self::new(
            settings.llm_base_url.clone(),
            settings.llm_api_key.clone(),
            settings.llm_model.clone(),
        )
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check if an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Internal request structure for the OpenAI-compatible API.
#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

/// Message in the wire format, used in both directions.
#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: ApiFunctionCall,
}

/// Function call with arguments encoded as a JSON string.
#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: Value,
}

/// Internal response structure from the OpenAI-compatible API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    id: Option<String>,
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl From<&ChatMessage> for ApiMessage {
    fn from(message: &ChatMessage) -> Self {
        let content = if message.role == ChatRole::Assistant
            && message.has_tool_calls()
            && message.content.is_empty()
        {
            None
        } else {
            Some(message.content.clone())
        };

        Self {
            role: message.role.as_str().to_string(),
            content,
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| ApiToolCall {
                    id: call.id.clone(),
                    kind: function_kind(),
                    function: ApiFunctionCall {
                        name: call.name.clone(),
                        arguments: encode_arguments(&call.arguments),
                    },
                })
                .collect(),
            tool_call_id: message.tool_call_id.clone(),
            name: message.name.clone(),
        }
    }
}

impl From<&ToolDefinition> for ApiTool {
    fn from(tool: &ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: ApiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }
}

/// Decode a tool call's JSON-string arguments; blank means no arguments.
/// Text that is not JSON is kept as a string so the tool can reject it.
fn decode_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(arguments = %raw, error = %e, "Tool call arguments are not valid JSON");
        Value::String(raw.to_string())
    })
}

/// Inverse of `decode_arguments`: undecodable text goes back unchanged.
fn encode_arguments(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}

fn into_chat_message(response: ApiResponse) -> Result<ChatMessage, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            ToolCall::new(
                call.id,
                call.function.name,
                decode_arguments(&call.function.arguments),
            )
        })
        .collect();

    let mut message = ChatMessage::assistant_with_tool_calls(
        choice.message.content.unwrap_or_default(),
        tool_calls,
    );
    message.id = response.id;
    Ok(message)
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn invoke(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<ChatMessage, LlmError> {
        let api_request = ApiRequest {
            model: &self.model,
            messages: messages.iter().map(ApiMessage::from).collect(),
            tools: tools.iter().map(ApiTool::from).collect(),
            tool_choice: if tools.is_empty() { None } else { Some("auto") },
        };

        let url = format!("{}/chat/completions", self.api_base);
        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "Requesting completion");

        let mut http_request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {}", api_key));
        }

        let http_response = http_request
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            let message = serde_json::from_str::<ApiErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);

            if status_code == 429 {
                return Err(LlmError::RateLimited(message));
            }
            return Err(LlmError::ApiError {
                code: status_code,
                message,
            });
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        into_chat_message(api_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_rejects_empty_base() {
        let result = OpenAiChatModel::new("  ", None, "gpt-5.2");
        assert!(matches!(result, Err(LlmError::MissingApiBase)));
    }

    #[test]
    fn test_new_trims_trailing_slash_and_empty_key() {
        let model =
            OpenAiChatModel::new("http://localhost:11434/v1/", Some(String::new()), "m").unwrap();
        assert_eq!(model.api_base(), "http://localhost:11434/v1");
        assert!(!model.has_api_key());
    }

    #[test]
    fn test_request_encodes_tool_call_arguments_as_string() {
        let call = ToolCall::new("c1", "calculate", json!({"expression": "2+2"}));
        let msg = ChatMessage::assistant_with_tool_calls("", vec![call]);
        let value = serde_json::to_value(ApiMessage::from(&msg)).unwrap();

        assert_eq!(value["content"], Value::Null);
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(
            value["tool_calls"][0]["function"]["arguments"],
            r#"{"expression":"2+2"}"#
        );
    }

    #[test]
    fn test_tools_are_advertised_as_functions() {
        let tool = ToolDefinition {
            name: "get_current_time".to_string(),
            description: "now".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        };
        let value = serde_json::to_value(ApiTool::from(&tool)).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "get_current_time");
    }

    #[test]
    fn test_response_decodes_tool_calls() {
        let response: ApiResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "jsonpath_query", "arguments": "{\"path\":\"$.a\"}"}
                    }]
                }
            }]
        }))
        .unwrap();

        let message = into_chat_message(response).unwrap();
        assert_eq!(message.role, ChatRole::Assistant);
        assert_eq!(message.id.as_deref(), Some("chatcmpl-1"));
        assert_eq!(message.tool_calls[0].arguments, json!({"path": "$.a"}));
    }

    #[test]
    fn test_response_without_choices_is_empty() {
        let response: ApiResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(
            into_chat_message(response),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_blank_arguments_decode_to_empty_object() {
        assert_eq!(decode_arguments(""), json!({}));
        assert_eq!(decode_arguments("{\"a\": 1}"), json!({"a": 1}));
    }

    #[test]
    fn test_malformed_arguments_are_kept_verbatim() {
        let decoded = decode_arguments("{not json");
        assert_eq!(decoded, Value::String("{not json".to_string()));
        assert_eq!(encode_arguments(&decoded), "{not json");
        assert_eq!(encode_arguments(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
