//! Session statistics tool

use super::{Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Reports message count and activity timestamps for a session by reading
/// the store; it never writes, so asking for stats twice in a row returns
/// the same answer.
pub struct SessionStatsTool;

#[async_trait]
impl Tool for SessionStatsTool {
    fn name(&self) -> &str {
        "getSessionStats"
    }

    fn description(&self) -> String {
        "Gets statistics about the current chat session. Use this when users ask about \
         the conversation history, message count, or session details."
            .to_string()
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sessionId": {
                    "type": "string",
                    "description": "The session ID to get stats for"
                }
            },
            "required": ["sessionId"]
        })
    }

    async fn run(&self, args: Value, ctx: ToolContext) -> ToolOutput {
        let Some(store) = &ctx.store else {
            return ToolOutput::error("StoreUnavailable: session storage is not configured");
        };

        let session_id = args
            .get("sessionId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(&ctx.session_id);

        match store.stats(session_id).await {
            Ok(stats) => match serde_json::to_string_pretty(&stats) {
                Ok(rendered) => ToolOutput::ok(rendered),
                Err(e) => ToolOutput::error(format!("session stats error: {e}")),
            },
            Err(e) => ToolOutput::error(format!("session stats error: {e}")),
        }
    }
}
