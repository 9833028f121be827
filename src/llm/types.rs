//! Common types for model interactions

use serde::{Deserialize, Serialize};

/// Message role on the wire and in stored transcripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One role-tagged conversation turn.
///
/// The browser sends plain user/assistant turns. Within a turn the
/// orchestrator appends assistant turns carrying tool-call requests and
/// tool turns carrying results; the same shape is what the conversation
/// record persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
    /// Originating tool name, set on `Role::Tool` turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            name: None,
        }
    }

    /// Assistant turn, with tool calls attached when the model made any.
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            name: None,
        }
    }

    /// Tool turn folding a result (or error text) back to the model.
    pub fn tool_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            name: Some(name.into()),
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Tool definition advertised to the model.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's arguments.
    pub parameters: serde_json::Value,
}

/// One model step: the transcript so far plus the available tools.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
}

/// Completed model step. Text accumulates everything that was streamed.
#[derive(Debug, Clone)]
pub struct StepResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Usage,
}

impl StepResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage for one step
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_wire_format() {
        let msg = ChatMessage::new(Role::User, "hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hello"}"#);
    }

    #[test]
    fn test_assistant_with_tool_calls() {
        let msg = ChatMessage::assistant(
            "",
            vec![ToolCallRequest {
                name: "calculator".to_string(),
                arguments: serde_json::json!({"expression": "2 + 2"}),
            }],
        );

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["toolCalls"][0]["name"], "calculator");
    }

    #[test]
    fn test_assistant_without_tool_calls_omits_field() {
        let msg = ChatMessage::assistant("plain answer", vec![]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("toolCalls"));
    }

    #[test]
    fn test_tool_result_carries_name() {
        let msg = ChatMessage::tool_result("calculator", "4");
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["name"], "calculator");
        assert_eq!(json["content"], "4");
    }

    #[test]
    fn test_browser_message_parses_without_extras() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"What's 15 * 23?"}"#).unwrap();
        assert_eq!(msg.role, Role::User);
        assert!(msg.tool_calls.is_none());
    }
}
