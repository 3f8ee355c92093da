//! Assistant turn controller
//!
//! Turns one user utterance into one assistant reply, invoking at most one
//! tool call in between: compose the history, ask the model once with the
//! sales tool advertised, and if the model requests it, run the query and
//! ask a second time seeded with the result. There is deliberately no
//! tool-call loop; the model cannot chain calls within a turn.

use crate::llm::{ChatClient, ChatMessage, ChatRequest, LlmError, ToolDefinition};
use crate::sales::SalesDb;
use std::sync::Arc;

/// Fixed system instruction prepended to every completion request.
pub const SYSTEM_PROMPT: &str = "You are the world's best data analyst, specializing exclusively in analyzing bicycle sales data for our company. You never make calculation errors. When appropriate, describe graphics or charts to visualize the data. Do not respond to any topics outside of sales data analysis. If the query is not about sales data, politely decline. You can query the sales database using the query_sales_db function. The sales table has columns: id (INTEGER), date (TEXT), product (TEXT), quantity (INTEGER), price (REAL), total (REAL).";

const SALES_TOOL_NAME: &str = "query_sales_db";

/// Reply used when the model requests a tool that was never advertised.
const UNKNOWN_TOOL_REPLY: &str = "Unknown tool called.";

/// The single tool advertised to the model.
pub fn sales_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: SALES_TOOL_NAME.to_string(),
        description: "Execute a SQL query on the sales database and return the results."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SQL query to execute on the sales table."
                }
            },
            "required": ["query"]
        }),
    }
}

pub struct TurnController {
    llm: Arc<dyn ChatClient>,
    sales: SalesDb,
}

impl TurnController {
    pub fn new(llm: Arc<dyn ChatClient>, sales: SalesDb) -> Self {
        Self { llm, sales }
    }

    /// Run one turn. `history` is the session so far, ending with the new
    /// user message. Returns the messages to append to the session, always
    /// ending with an assistant message: remote failures are converted into
    /// an error-text reply at this boundary, never propagated.
    pub async fn run_turn(&self, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut produced = Vec::new();
        let reply = match self.try_turn(history, &mut produced).await {
            Ok(text) => text,
            Err(e) => format!("Error: {e}"),
        };
        produced.push(ChatMessage::assistant(reply));
        produced
    }

    async fn try_turn(
        &self,
        history: &[ChatMessage],
        produced: &mut Vec<ChatMessage>,
    ) -> Result<String, LlmError> {
        let first = self
            .llm
            .complete(&ChatRequest {
                system: SYSTEM_PROMPT.to_string(),
                messages: history.to_vec(),
                tools: vec![sales_tool_definition()],
            })
            .await?;

        // No tool requested: the first completion is the reply.
        let Some(call) = first.tool_calls.first() else {
            return Ok(first.content);
        };

        if call.name != SALES_TOOL_NAME {
            tracing::warn!(tool = %call.name, "Model requested an unadvertised tool");
            return Ok(UNKNOWN_TOOL_REPLY.to_string());
        }

        // Only the first requested call is honored.
        if first.tool_calls.len() > 1 {
            tracing::warn!(
                ignored = first.tool_calls.len() - 1,
                "Ignoring extra simultaneous tool calls"
            );
        }

        let result = match call.arguments.get("query").and_then(|v| v.as_str()) {
            Some(query) => {
                tracing::info!(query = %query, "Running sales query for tool call");
                self.sales.execute(query)
            }
            None => "Error: tool call arguments did not contain a 'query' string".to_string(),
        };

        produced.push(ChatMessage::assistant_tool_call(call.clone()));
        produced.push(ChatMessage::tool_result(&call.id, &result));

        let mut messages = history.to_vec();
        messages.extend(produced.iter().cloned());

        let second = self
            .llm
            .complete(&ChatRequest {
                system: SYSTEM_PROMPT.to_string(),
                messages,
                tools: Vec::new(),
            })
            .await?;

        Ok(second.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockChatClient;
    use crate::llm::{ChatCompletion, Role, ToolCallRequest};

    fn controller_with_mock() -> (Arc<MockChatClient>, TurnController) {
        let mock = Arc::new(MockChatClient::new());
        let sales = SalesDb::open_in_memory().unwrap();
        let controller = TurnController::new(mock.clone(), sales);
        (mock, controller)
    }

    fn sales_call(id: &str, query: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.to_string(),
            name: SALES_TOOL_NAME.to_string(),
            arguments: serde_json::json!({ "query": query }),
        }
    }

    /// Scenario 1: tool round trip. Two completion calls, the second seeded
    /// with a tool-role message carrying the exact query result.
    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let (mock, controller) = controller_with_mock();
        let query = "SELECT SUM(total) FROM sales WHERE date LIKE '2024-03%'";
        let expected_rows = SalesDb::open_in_memory().unwrap().execute(query);

        mock.queue_completion(ChatCompletion {
            content: String::new(),
            tool_calls: vec![sales_call("call-1", query)],
        });
        mock.queue_completion(ChatCompletion::text("March sales totaled $6,245.50."));

        let history = vec![ChatMessage::user("What were total sales in March?")];
        let produced = controller.run_turn(&history).await;

        // assistant(tool call) + tool(result) + assistant(reply)
        assert_eq!(produced.len(), 3);
        assert_eq!(produced[0].role, Role::Assistant);
        assert_eq!(
            produced[0].tool_calls.as_ref().unwrap()[0].id,
            "call-1"
        );
        assert_eq!(produced[1].role, Role::Tool);
        assert_eq!(produced[1].content, expected_rows);
        assert_eq!(produced[1].tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(produced[2].role, Role::Assistant);
        assert_eq!(produced[2].content, "March sales totaled $6,245.50.");

        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 2, "exactly two completion calls");
        assert_eq!(requests[0].tools.len(), 1);
        assert!(requests[1].tools.is_empty(), "second call advertises no tools");

        // The second request carries the tool result verbatim
        let tool_msg = requests[1]
            .messages
            .iter()
            .find(|m| m.role == Role::Tool)
            .expect("second request should include the tool message");
        assert_eq!(tool_msg.content, expected_rows);
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call-1"));
    }

    /// Scenario 2: no tool call. One completion, one new assistant message.
    #[tokio::test]
    async fn test_plain_reply_without_tool_call() {
        let (mock, controller) = controller_with_mock();
        mock.queue_completion(ChatCompletion::text(
            "I can only help with sales data analysis.",
        ));

        let history = vec![ChatMessage::user("What's the weather?")];
        let produced = controller.run_turn(&history).await;

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].role, Role::Assistant);
        assert_eq!(produced[0].content, "I can only help with sales data analysis.");
        assert_eq!(mock.recorded_requests().len(), 1);
    }

    /// Scenario 3: remote failure. The error text becomes the reply; no
    /// error escapes the turn boundary.
    #[tokio::test]
    async fn test_remote_failure_becomes_reply() {
        let (mock, controller) = controller_with_mock();
        mock.queue_error(LlmError::network("Connection failed: dns error"));

        let history = vec![ChatMessage::user("What were total sales in March?")];
        let produced = controller.run_turn(&history).await;

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].role, Role::Assistant);
        assert_eq!(
            produced[0].content,
            "Error: Connection failed: dns error"
        );
    }

    /// Failure on the second completion still ends the turn with an
    /// assistant message, after the tool exchange.
    #[tokio::test]
    async fn test_failure_after_tool_call_still_completes_turn() {
        let (mock, controller) = controller_with_mock();
        mock.queue_completion(ChatCompletion {
            content: String::new(),
            tool_calls: vec![sales_call("call-1", "SELECT COUNT(*) FROM sales")],
        });
        mock.queue_error(LlmError::server_error("Server error: 503"));

        let history = vec![ChatMessage::user("How many sales rows are there?")];
        let produced = controller.run_turn(&history).await;

        assert_eq!(produced.len(), 3);
        assert_eq!(produced[1].role, Role::Tool);
        assert_eq!(produced[2].content, "Error: Server error: 503");
    }

    #[tokio::test]
    async fn test_unknown_tool_yields_fixed_reply_without_second_call() {
        let (mock, controller) = controller_with_mock();
        mock.queue_completion(ChatCompletion {
            content: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: "call-1".to_string(),
                name: "drop_all_tables".to_string(),
                arguments: serde_json::json!({}),
            }],
        });

        let produced = controller
            .run_turn(&[ChatMessage::user("hello")])
            .await;

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].content, UNKNOWN_TOOL_REPLY);
        assert_eq!(mock.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_only_first_tool_call_is_honored() {
        let (mock, controller) = controller_with_mock();
        mock.queue_completion(ChatCompletion {
            content: String::new(),
            tool_calls: vec![
                sales_call("call-1", "SELECT COUNT(*) FROM sales"),
                sales_call("call-2", "SELECT SUM(total) FROM sales"),
            ],
        });
        mock.queue_completion(ChatCompletion::text("There are 8 rows."));

        let produced = controller
            .run_turn(&[ChatMessage::user("How many rows?")])
            .await;

        assert_eq!(produced.len(), 3);
        let calls = produced[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1, "only the honored call is replayed");
        assert_eq!(calls[0].id, "call-1");
        assert_eq!(produced[1].tool_call_id.as_deref(), Some("call-1"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_feed_error_to_model() {
        let (mock, controller) = controller_with_mock();
        mock.queue_completion(ChatCompletion {
            content: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: "call-1".to_string(),
                name: SALES_TOOL_NAME.to_string(),
                arguments: serde_json::json!({ "sql": "SELECT 1" }),
            }],
        });
        mock.queue_completion(ChatCompletion::text("Sorry, I could not run that."));

        let produced = controller
            .run_turn(&[ChatMessage::user("count sales")])
            .await;

        assert_eq!(produced.len(), 3);
        assert!(produced[1].content.starts_with("Error:"));
        assert_eq!(mock.recorded_requests().len(), 2);
    }
}
