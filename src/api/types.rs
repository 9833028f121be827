//! API request and response types

use serde::{Deserialize, Serialize};

use crate::llm::ChatMessage;

/// Request to run a chat turn
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Absent means the server mints a fresh session id.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response for session creation
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedResponse {
    pub session_id: String,
}

/// Response for the model diagnostic endpoint
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAiResponse {
    pub success: bool,
    pub model_id: String,
    pub response: String,
}

/// Error response
///
/// `error` is the short description; `message` and `details` carry the
/// underlying cause when one exists.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
            details: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_accepts_plain_turns() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"hi"}],"sessionId":"abc"}"#,
        )
        .unwrap();

        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_chat_request_defaults() {
        let req: ChatRequest = serde_json::from_str("{}").unwrap();
        assert!(req.messages.is_empty());
        assert!(req.session_id.is_none());
    }

    #[test]
    fn test_error_response_omits_empty_fields() {
        let json = serde_json::to_string(&ErrorResponse::new("nope")).unwrap();
        assert_eq!(json, r#"{"error":"nope"}"#);
    }
}
