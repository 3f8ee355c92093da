//! `OpenAI` chat-completions provider implementation

use super::types::{ChatCompletion, ChatMessage, ChatRequest, Role, ToolCallRequest};
use super::{ChatClient, LlmError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible chat service
pub struct OpenAIChatService {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIChatService {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// Point at a non-default endpoint (OpenAI-compatible gateways).
    pub fn with_base_url(api_key: String, model: String, base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            model,
            base_url: base_url.into(),
        }
    }

    fn translate_request(&self, request: &ChatRequest) -> WireRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if !request.system.is_empty() {
            messages.push(WireMessage {
                role: "system".to_string(),
                content: Some(request.system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        for msg in &request.messages {
            messages.push(Self::translate_message(msg));
        }

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|t| WireTool {
                        r#type: "function".to_string(),
                        function: WireFunction {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.input_schema.clone(),
                        },
                    })
                    .collect(),
            )
        };

        let tool_choice = tools.as_ref().map(|_| "auto".to_string());

        WireRequest {
            model: self.model.clone(),
            messages,
            tools,
            tool_choice,
            stream: false,
        }
    }

    fn translate_message(msg: &ChatMessage) -> WireMessage {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|c| WireToolCall {
                    id: c.id.clone(),
                    r#type: "function".to_string(),
                    function: WireFunctionCall {
                        name: c.name.clone(),
                        arguments: serde_json::to_string(&c.arguments)
                            .unwrap_or_else(|_| "{}".to_string()),
                    },
                })
                .collect()
        });

        // Assistant messages that only carry tool calls have no text content
        let content = if msg.content.is_empty() && tool_calls.is_some() {
            None
        } else {
            Some(msg.content.clone())
        };

        WireMessage {
            role: role.to_string(),
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
        }
    }

    fn normalize_response(resp: WireResponse) -> Result<ChatCompletion, LlmError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::unknown("No choices in response"))?;

        let content = choice.message.content.unwrap_or_default();

        let mut tool_calls = Vec::new();
        if let Some(calls) = choice.message.tool_calls {
            for tc in calls {
                if tc.function.name.is_empty() {
                    continue;
                }

                // Arguments arrive as a JSON-encoded string; parse as data,
                // never evaluate.
                let arguments =
                    serde_json::from_str(&tc.function.arguments).unwrap_or_else(|e| {
                        tracing::warn!(
                            error = %e,
                            arguments = %tc.function.arguments,
                            "Failed to parse tool call arguments"
                        );
                        serde_json::json!({})
                    });

                tool_calls.push(ToolCallRequest {
                    id: tc.id,
                    name: tc.function.name,
                    arguments,
                });
            }
        }

        Ok(ChatCompletion {
            content,
            tool_calls,
        })
    }
}

#[async_trait]
impl ChatClient for OpenAIChatService {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, LlmError> {
        let wire_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(error_resp) = serde_json::from_str::<WireErrorResponse>(&body) {
                let message = error_resp.error.message;
                return Err(match status.as_u16() {
                    401 => LlmError::auth(format!("Authentication failed: {message}")),
                    429 => LlmError::rate_limit(format!("Rate limit exceeded: {message}")),
                    400 => LlmError::invalid_request(format!("Invalid request: {message}")),
                    500..=599 => LlmError::server_error(format!("Server error: {message}")),
                    _ => LlmError::unknown(format!("HTTP {status}: {message}")),
                });
            }
            return Err(LlmError::unknown(format!("HTTP {status} error: {body}")));
        }

        let wire_response: WireResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Self::normalize_response(wire_response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    r#type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolDefinition;

    fn service() -> OpenAIChatService {
        OpenAIChatService::new("test-key".to_string(), "gpt-4o".to_string())
    }

    #[test]
    fn test_translate_puts_system_first() {
        let request = ChatRequest {
            system: "Be helpful".to_string(),
            messages: vec![ChatMessage::user("hi")],
            tools: vec![],
        };

        let wire = service().translate_request(&request);
        assert_eq!(wire.messages.len(), 2);
        assert_eq!(wire.messages[0].role, "system");
        assert_eq!(wire.messages[0].content.as_deref(), Some("Be helpful"));
        assert_eq!(wire.messages[1].role, "user");
        assert!(wire.tools.is_none());
        assert!(wire.tool_choice.is_none());
    }

    #[test]
    fn test_translate_advertises_tools_with_auto_choice() {
        let request = ChatRequest {
            system: "sys".to_string(),
            messages: vec![ChatMessage::user("hi")],
            tools: vec![ToolDefinition {
                name: "query_sales_db".to_string(),
                description: "Run a query".to_string(),
                input_schema: serde_json::json!({"type": "object"}),
            }],
        };

        let wire = service().translate_request(&request);
        let tools = wire.tools.expect("tools should be present");
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, "query_sales_db");
        assert_eq!(wire.tool_choice.as_deref(), Some("auto"));
    }

    #[test]
    fn test_translate_tool_call_and_result_messages() {
        let call = ToolCallRequest {
            id: "call-1".to_string(),
            name: "query_sales_db".to_string(),
            arguments: serde_json::json!({"query": "SELECT 1"}),
        };
        let request = ChatRequest {
            system: String::new(),
            messages: vec![
                ChatMessage::assistant_tool_call(call),
                ChatMessage::tool_result("call-1", "[(1,)]"),
            ],
            tools: vec![],
        };

        let wire = service().translate_request(&request);
        assert_eq!(wire.messages.len(), 2);

        let assistant = &wire.messages[0];
        assert_eq!(assistant.role, "assistant");
        assert!(assistant.content.is_none());
        let calls = assistant.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id, "call-1");
        assert_eq!(calls[0].function.arguments, r#"{"query":"SELECT 1"}"#);

        let tool = &wire.messages[1];
        assert_eq!(tool.role, "tool");
        assert_eq!(tool.content.as_deref(), Some("[(1,)]"));
        assert_eq!(tool.tool_call_id.as_deref(), Some("call-1"));
    }

    #[test]
    fn test_normalize_plain_text_response() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Hello there"}}
            ]
        }"#;
        let resp: WireResponse = serde_json::from_str(body).unwrap();

        let completion = OpenAIChatService::normalize_response(resp).unwrap();
        assert_eq!(completion.content, "Hello there");
        assert!(completion.tool_calls.is_empty());
    }

    #[test]
    fn test_normalize_tool_call_response_parses_arguments_as_data() {
        let body = r#"{
            "choices": [
                {"message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call-9", "type": "function", "function": {
                            "name": "query_sales_db",
                            "arguments": "{\"query\": \"SELECT SUM(total) FROM sales\"}"
                        }}
                    ]
                }}
            ]
        }"#;
        let resp: WireResponse = serde_json::from_str(body).unwrap();

        let completion = OpenAIChatService::normalize_response(resp).unwrap();
        assert_eq!(completion.content, "");
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].id, "call-9");
        assert_eq!(
            completion.tool_calls[0].arguments["query"],
            "SELECT SUM(total) FROM sales"
        );
    }

    #[test]
    fn test_normalize_unparseable_arguments_become_empty_object() {
        let body = r#"{
            "choices": [
                {"message": {
                    "role": "assistant",
                    "tool_calls": [
                        {"id": "call-1", "type": "function", "function": {
                            "name": "query_sales_db",
                            "arguments": "__import__('os')"
                        }}
                    ]
                }}
            ]
        }"#;
        let resp: WireResponse = serde_json::from_str(body).unwrap();

        let completion = OpenAIChatService::normalize_response(resp).unwrap();
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].arguments, serde_json::json!({}));
    }

    #[test]
    fn test_normalize_empty_choices_is_error() {
        let resp: WireResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(OpenAIChatService::normalize_response(resp).is_err());
    }
}
