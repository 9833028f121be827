//! Workers AI provider implementation
//!
//! Speaks the `/ai/run/{model}` REST surface: one POST per step with
//! `stream: true`, answered as an SSE stream of JSON chunks terminated by
//! a `[DONE]` sentinel. Text arrives as `response` fragments; tool calls
//! and usage arrive in later chunks once the model commits to them.

use super::stream;
use super::types::*;
use super::{AiConfig, ChatModel, ModelError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Model used when `WORKERS_AI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "@cf/meta/llama-3.1-8b-instruct";

const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Workers AI service implementation
pub struct WorkersAiService {
    client: Client,
    run_url: String,
    api_token: Option<String>,
    model: String,
}

impl WorkersAiService {
    /// Build from config; `None` when no endpoint can be derived.
    pub fn new(config: &AiConfig) -> Option<Self> {
        let run_url = match (&config.base_url, &config.account_id) {
            (Some(base), _) => base.trim_end_matches('/').to_string(),
            (None, Some(account)) if config.api_token.is_some() => {
                format!("https://api.cloudflare.com/client/v4/accounts/{account}/ai/run")
            }
            _ => return None,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Some(Self {
            client,
            run_url,
            api_token: config.api_token.clone(),
            model: config.model.clone(),
        })
    }

    fn translate_request(&self, request: &ModelRequest) -> WireRequest {
        let messages: Vec<WireMessage> = request
            .messages
            .iter()
            .map(translate_message)
            .collect();

        let tools: Vec<WireTool> = request
            .tools
            .iter()
            .map(|t| WireTool {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            })
            .collect();

        WireRequest {
            messages,
            tools: if tools.is_empty() { None } else { Some(tools) },
            stream: true,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    fn classify_error(&self, status: reqwest::StatusCode, body: &str) -> ModelError {
        let message = body.to_string();
        match status.as_u16() {
            401 | 403 => ModelError::auth(format!("Authentication failed: {message}")),
            429 => ModelError::rate_limit(format!("Rate limited: {message}")),
            400 => ModelError::invalid_request(format!("Invalid request: {message}")),
            500..=599 => ModelError::server_error(format!("Server error: {message}")),
            _ => ModelError::unknown(format!("HTTP {status}: {message}")),
        }
    }
}

fn translate_message(msg: &ChatMessage) -> WireMessage {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    WireMessage {
        role: role.to_string(),
        content: msg.content.clone(),
        tool_calls: msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|c| WireToolCall {
                    name: c.name.clone(),
                    arguments: c.arguments.clone(),
                })
                .collect()
        }),
        name: msg.name.clone(),
    }
}

#[async_trait]
impl ChatModel for WorkersAiService {
    async fn stream_step(
        &self,
        request: &ModelRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<StepResponse, ModelError> {
        let wire_request = self.translate_request(request);
        let url = format!("{}/{}", self.run_url, self.model);

        let mut builder = self.client.post(&url).json(&wire_request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::network(format!("Request timeout: {e}"))
            } else if e.is_connect() {
                ModelError::network(format!("Connection failed: {e}"))
            } else {
                ModelError::unknown(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.classify_error(status, &body));
        }

        let mut reader = stream::from_response(response);
        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = Usage::default();

        loop {
            let event = reader
                .next_event()
                .await
                .map_err(|e| ModelError::network(format!("Stream read failed: {e}")))?;
            let Some(event) = event else { break };
            if event.data == "[DONE]" {
                break;
            }

            let chunk: WireChunk = serde_json::from_str(&event.data).map_err(|e| {
                ModelError::unknown(format!(
                    "Unparseable stream chunk: {e} - data: {}",
                    event.data
                ))
            })?;

            if let Some(delta) = chunk.response {
                if !delta.is_empty() {
                    text.push_str(&delta);
                    // A closed receiver means the client went away; the step
                    // still runs to completion for the transcript.
                    let _ = deltas.send(delta).await;
                }
            }

            if let Some(calls) = chunk.tool_calls {
                tool_calls.extend(calls.into_iter().map(|c| ToolCallRequest {
                    name: c.name,
                    arguments: c.arguments,
                }));
            }

            if let Some(wire) = chunk.usage {
                usage = Usage {
                    prompt_tokens: wire.prompt_tokens,
                    completion_tokens: wire.completion_tokens,
                    total_tokens: wire.total_tokens,
                };
            }
        }

        Ok(StepResponse {
            text,
            tool_calls,
            usage,
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Workers AI wire types

#[derive(Debug, Serialize)]
struct WireRequest {
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    stream: bool,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base_url: &str) -> WorkersAiService {
        WorkersAiService::new(&AiConfig {
            account_id: None,
            api_token: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: Some(base_url.to_string()),
        })
        .unwrap()
    }

    #[test]
    fn test_requires_credentials_or_base_url() {
        assert!(WorkersAiService::new(&AiConfig {
            account_id: None,
            api_token: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
        })
        .is_none());

        assert!(WorkersAiService::new(&AiConfig {
            account_id: Some("acct".to_string()),
            api_token: Some("token".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
        })
        .is_some());
    }

    #[test]
    fn test_translate_request_shape() {
        let svc = service("http://localhost/run");
        let request = ModelRequest {
            messages: vec![
                ChatMessage::new(Role::User, "What's 2 + 2?"),
                ChatMessage::assistant(
                    "",
                    vec![ToolCallRequest {
                        name: "calculator".to_string(),
                        arguments: serde_json::json!({"expression": "2 + 2"}),
                    }],
                ),
                ChatMessage::tool_result("calculator", "4"),
            ],
            tools: vec![ToolDefinition {
                name: "calculator".to_string(),
                description: "math".to_string(),
                parameters: serde_json::json!({"type": "object"}),
            }],
            max_tokens: None,
        };

        let wire = serde_json::to_value(svc.translate_request(&request)).unwrap();
        assert_eq!(wire["stream"], true);
        assert_eq!(wire["max_tokens"], DEFAULT_MAX_TOKENS);
        assert_eq!(wire["messages"][0]["role"], "user");
        assert_eq!(wire["messages"][1]["tool_calls"][0]["name"], "calculator");
        assert_eq!(wire["messages"][2]["role"], "tool");
        assert_eq!(wire["messages"][2]["name"], "calculator");
        assert_eq!(wire["tools"][0]["parameters"]["type"], "object");
    }

    #[test]
    fn test_translate_request_omits_empty_tools() {
        let svc = service("http://localhost/run");
        let request = ModelRequest {
            messages: vec![ChatMessage::new(Role::User, "hi")],
            tools: vec![],
            max_tokens: Some(64),
        };

        let wire = serde_json::to_value(svc.translate_request(&request)).unwrap();
        assert!(wire.get("tools").is_none());
        assert_eq!(wire["max_tokens"], 64);
    }

    #[test]
    fn test_chunk_parsing() {
        let chunk: WireChunk = serde_json::from_str(
            r#"{"response":"The answer","tool_calls":[{"name":"calculator","arguments":{"expression":"15 * 23"}}],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
        )
        .unwrap();

        assert_eq!(chunk.response.as_deref(), Some("The answer"));
        assert_eq!(chunk.tool_calls.unwrap()[0].name, "calculator");
        assert_eq!(chunk.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_chunk_parsing_tolerates_null_usage() {
        let chunk: WireChunk = serde_json::from_str(r#"{"response":"x","usage":null}"#).unwrap();
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn test_error_classification() {
        let svc = service("http://localhost/run");
        assert_eq!(
            svc.classify_error(reqwest::StatusCode::UNAUTHORIZED, "no").kind,
            crate::llm::ModelErrorKind::Auth
        );
        assert_eq!(
            svc.classify_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow").kind,
            crate::llm::ModelErrorKind::RateLimit
        );
        assert_eq!(
            svc.classify_error(reqwest::StatusCode::BAD_REQUEST, "bad").kind,
            crate::llm::ModelErrorKind::InvalidRequest
        );
        assert_eq!(
            svc.classify_error(reqwest::StatusCode::BAD_GATEWAY, "down").kind,
            crate::llm::ModelErrorKind::ServerError
        );
    }
}
