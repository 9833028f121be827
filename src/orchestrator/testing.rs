//! Mock implementations for testing
//!
//! These mocks enable turn-level testing without real inference calls.

use crate::llm::{ChatModel, ModelError, ModelRequest, StepResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Mock chat model that returns queued step responses.
///
/// Step text is delivered over the delta channel in word-sized chunks
/// before the step resolves, mimicking how the real provider streams.
#[allow(dead_code)]
pub struct MockChatModel {
    responses: Mutex<VecDeque<Result<StepResponse, ModelError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<ModelRequest>>,
}

#[allow(dead_code)]
impl MockChatModel {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: "mock-model".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful step response
    pub fn queue_response(&self, response: StepResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: ModelError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockChatModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn stream_step(
        &self,
        request: &ModelRequest,
        deltas: mpsc::Sender<String>,
    ) -> Result<StepResponse, ModelError> {
        self.requests.lock().unwrap().push(request.clone());

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::network("No mock response queued")))?;

        for chunk in response.text.split_inclusive(' ') {
            // A gone receiver stops delivery, not the step.
            let _ = deltas.send(chunk.to_string()).await;
        }
        Ok(response)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Usage;

    #[tokio::test]
    async fn test_mock_streams_text_then_resolves() {
        let mock = MockChatModel::new();
        mock.queue_response(StepResponse {
            text: "one two three".to_string(),
            tool_calls: vec![],
            usage: Usage::default(),
        });

        let request = ModelRequest {
            messages: vec![],
            tools: vec![],
            max_tokens: None,
        };
        let (tx, mut rx) = mpsc::channel(8);
        let response = mock.stream_step(&request, tx).await.unwrap();

        assert_eq!(response.text, "one two three");

        let mut streamed = String::new();
        while let Some(chunk) = rx.recv().await {
            streamed.push_str(&chunk);
        }
        assert_eq!(streamed, response.text);
        assert_eq!(mock.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unqueued_call_is_an_error() {
        let mock = MockChatModel::new();
        let request = ModelRequest {
            messages: vec![],
            tools: vec![],
            max_tokens: None,
        };
        let (tx, _rx) = mpsc::channel(8);

        assert!(mock.stream_step(&request, tx).await.is_err());
    }
}
