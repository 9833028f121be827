//! Fire-and-forget notifications to the coordination service.
//!
//! The relay is advisory: a chat turn tells the coordinator that processing
//! happened and never waits for, or acts on, the answer. A dead coordinator
//! costs one warn log per turn and nothing else.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Action tag sent with every turn notification.
pub const PROCESS_CHAT: &str = "process_chat";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("coordinator request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("coordinator returned HTTP {0}")]
    Status(u16),
}

/// Relay connection settings, read from the environment.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub base_url: String,
}

impl RelayConfig {
    /// `None` when `COORDINATOR_URL` is unset; coordination is optional.
    pub fn from_env() -> Option<Self> {
        std::env::var("COORDINATOR_URL")
            .ok()
            .map(|base_url| Self { base_url })
    }
}

/// Request body for a coordination call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CoordinateRequest<'a> {
    session_id: &'a str,
    message_count: usize,
    action: &'a str,
}

#[derive(Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    /// Short timeout: the notification is not worth waiting on.
    const TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(config: &RelayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// One synchronous coordination call. The serving path only reaches this
    /// through [`notify_detached`](Self::notify_detached).
    pub async fn coordinate(&self, session_id: &str, message_count: usize) -> Result<(), RelayError> {
        let response = self
            .client
            .post(format!("{}/api/chat/coordinate", self.base_url))
            .json(&CoordinateRequest {
                session_id,
                message_count,
                action: PROCESS_CHAT,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Notify the coordinator about a processed turn without blocking the
    /// turn. The spawned task owns its clone of the client; failure is
    /// logged and discarded.
    pub fn notify_detached(&self, session_id: String, message_count: usize) {
        let relay = self.clone();
        tokio::spawn(async move {
            if let Err(e) = relay.coordinate(&session_id, message_count).await {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Coordination notify failed"
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = RelayConfig {
            base_url: "http://localhost:8788/".to_string(),
        };
        let client = RelayClient::new(&config);
        assert_eq!(client.base_url, "http://localhost:8788");
    }

    #[test]
    fn test_request_wire_format() {
        let body = serde_json::to_value(CoordinateRequest {
            session_id: "abc",
            message_count: 4,
            action: PROCESS_CHAT,
        })
        .unwrap();

        assert_eq!(body["sessionId"], "abc");
        assert_eq!(body["messageCount"], 4);
        assert_eq!(body["action"], "process_chat");
    }

    #[tokio::test]
    async fn test_coordinate_against_unreachable_host_is_an_error() {
        let config = RelayConfig {
            // Reserved TEST-NET-1 address; connection refused or timed out.
            base_url: "http://192.0.2.1:1".to_string(),
        };
        let relay = RelayClient {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(200))
                .build()
                .unwrap(),
            base_url: config.base_url.clone(),
        };

        assert!(relay.coordinate("s", 1).await.is_err());
    }
}
