//! Tool-calling turn orchestration
//!
//! A turn is one client request. The orchestrator pushes the transcript
//! through the model, dispatches whatever tools the model asks for, feeds
//! the results back, and repeats until the model answers in plain text or
//! the step budget runs out. Every outcome, including failure, travels
//! in-band over the turn's event channel; once the stream is open nothing
//! here can change the HTTP status.

pub mod testing;

use crate::llm::{ChatMessage, ChatModel, ModelRequest, ToolCallRequest};
use crate::relay::RelayClient;
use crate::store::SessionStore;
use crate::tools::{ToolContext, ToolOutput, ToolRegistry};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Upper bound on model steps within one turn. A model still asking for
/// tools at the boundary gets cut off, not errored.
pub const MAX_TOOL_STEPS: usize = 5;

/// Events delivered to the client over a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// Incremental assistant text.
    Delta(String),
    /// The turn finished. `truncated` marks a turn cut off at the step
    /// budget rather than by the model ending on plain text.
    Done { truncated: bool },
    /// The turn failed after the stream opened.
    Error { message: String },
}

/// Drives tool-calling turns against a model, a tool set, and optional
/// persistence and coordination capabilities.
pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    store: Option<SessionStore>,
    relay: Option<RelayClient>,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
        store: Option<SessionStore>,
        relay: Option<RelayClient>,
    ) -> Self {
        Self {
            model,
            tools,
            store,
            relay,
        }
    }

    /// Run one turn to completion, emitting progress on `events`.
    ///
    /// Send failures are ignored: a gone client stops delivery, never the
    /// turn. Persistence and coordination are kicked off detached before
    /// the first model call and can neither delay nor fail the turn.
    pub async fn run_turn(
        &self,
        session_id: &str,
        messages: Vec<ChatMessage>,
        events: mpsc::Sender<TurnEvent>,
    ) {
        tracing::info!(
            session_id = %session_id,
            messages = messages.len(),
            model = self.model.model_id(),
            "Starting chat turn"
        );

        self.persist_turn_start(session_id, &messages);

        let definitions = self.tools.definitions();
        let mut transcript = messages;

        for step in 1..=MAX_TOOL_STEPS {
            let request = ModelRequest {
                messages: transcript.clone(),
                tools: definitions.clone(),
                max_tokens: None,
            };

            let (delta_tx, mut delta_rx) = mpsc::channel::<String>(32);
            let forwarder = {
                let events = events.clone();
                tokio::spawn(async move {
                    // Keep draining after the client is gone so the model
                    // task never blocks on a full channel.
                    while let Some(text) = delta_rx.recv().await {
                        let _ = events.send(TurnEvent::Delta(text)).await;
                    }
                })
            };

            let result = self.model.stream_step(&request, delta_tx).await;
            // All deltas of this step are forwarded before anything that
            // follows them.
            let _ = forwarder.await;

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        session_id = %session_id,
                        step,
                        error = %e,
                        "Model step failed"
                    );
                    let _ = events
                        .send(TurnEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                    return;
                }
            };

            if !response.has_tool_calls() {
                let _ = events.send(TurnEvent::Done { truncated: false }).await;
                return;
            }

            if step == MAX_TOOL_STEPS {
                // No further model call will consume tool results, so the
                // pending calls are dropped undispatched.
                break;
            }

            let names: Vec<&str> = response
                .tool_calls
                .iter()
                .map(|c| c.name.as_str())
                .collect();
            tracing::info!(
                session_id = %session_id,
                step,
                tools = ?names,
                "Dispatching tool calls"
            );

            transcript.push(ChatMessage::assistant(
                response.text.clone(),
                response.tool_calls.clone(),
            ));
            let results = self.dispatch_all(session_id, &response.tool_calls).await;
            for (call, output) in response.tool_calls.iter().zip(results) {
                if let Some(error) = &output.error {
                    tracing::warn!(
                        session_id = %session_id,
                        tool = %call.name,
                        error = %error,
                        "Tool call failed"
                    );
                }
                transcript.push(ChatMessage::tool_result(&call.name, fold_output(output)));
            }
        }

        tracing::warn!(
            session_id = %session_id,
            max_steps = MAX_TOOL_STEPS,
            "Turn truncated at step budget with tool calls still pending"
        );
        let _ = events.send(TurnEvent::Done { truncated: true }).await;
    }

    /// All tool calls of one step run concurrently; results come back in
    /// request order.
    async fn dispatch_all(&self, session_id: &str, calls: &[ToolCallRequest]) -> Vec<ToolOutput> {
        join_all(calls.iter().map(|call| {
            let ctx = ToolContext::new(session_id, self.store.clone());
            self.tools.dispatch(&call.name, call.arguments.clone(), ctx)
        }))
        .await
    }

    /// Detached best-effort writes at turn start: conversation overwrite,
    /// session activity bump, coordinator notify. The coordinator updates
    /// the same session record on its own; neither writer is ordered
    /// against the other, and the last one wins.
    fn persist_turn_start(&self, session_id: &str, messages: &[ChatMessage]) {
        if let Some(store) = &self.store {
            let store = store.clone();
            let session_id = session_id.to_string();
            let messages = messages.to_vec();
            tokio::spawn(async move {
                if let Err(e) = store.save_conversation(&session_id, &messages).await {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %e,
                        "Failed to save conversation"
                    );
                }
                let count = u32::try_from(messages.len()).unwrap_or(u32::MAX);
                if let Err(e) = store.record_turn(&session_id, count).await {
                    tracing::warn!(
                        session_id = %session_id,
                        error = %e,
                        "Failed to update session activity"
                    );
                }
            });
        }

        if let Some(relay) = &self.relay {
            relay.notify_detached(session_id.to_string(), messages.len());
        }
    }
}

/// Fold a tool outcome into the single text the model sees: errors as
/// `Error: <message>`, success text verbatim.
fn fold_output(output: ToolOutput) -> String {
    match output.error {
        Some(message) => format!("Error: {message}"),
        None => output.result.unwrap_or_default(),
    }
}
