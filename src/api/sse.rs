//! Server-Sent Events support
//!
//! Turn events arrive on an mpsc channel and leave as named SSE events.
//! The stream ends when the turn task drops its sender.

use crate::orchestrator::TurnEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Convert a turn's event channel to an SSE response
pub fn turn_stream(
    events: tokio::sync::mpsc::Receiver<TurnEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = ReceiverStream::new(events).map(|event| Ok(turn_event_to_axum(event)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn turn_event_to_axum(event: TurnEvent) -> Event {
    let (event_type, data) = encode(event);
    Event::default().event(event_type).data(data.to_string())
}

fn encode(event: TurnEvent) -> (&'static str, serde_json::Value) {
    match event {
        TurnEvent::Delta(text) => (
            "delta",
            json!({
                "type": "delta",
                "text": text
            }),
        ),
        TurnEvent::Done { truncated } => (
            "done",
            json!({
                "type": "done",
                "truncated": truncated
            }),
        ),
        TurnEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    }
}
