//! Incremental Server-Sent Events reader for provider responses.
//!
//! Reads line by line off the response body so deltas can be forwarded the
//! moment they arrive, without waiting for the body to complete. Chunk
//! boundaries from the transport do not line up with event boundaries; the
//! buffered reader hides that.

use futures::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio_util::io::StreamReader;

/// A single SSE event parsed from the stream.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// The event type, when the server names one.
    pub event: Option<String>,
    /// The event data (usually a JSON payload).
    pub data: String,
}

/// Pull-based SSE event reader.
pub struct SseReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> SseReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next complete event, or `None` at end of stream.
    pub async fn next_event(&mut self) -> std::io::Result<Option<SseEvent>> {
        let mut current_event: Option<String> = None;
        let mut current_data = String::new();

        while let Some(line) = self.lines.next_line().await? {
            if line.is_empty() {
                // Empty line = end of event
                if !current_data.is_empty() {
                    return Ok(Some(SseEvent {
                        event: current_event,
                        data: current_data,
                    }));
                }
                current_event = None;
                continue;
            }

            if let Some(event_type) = line.strip_prefix("event: ") {
                current_event = Some(event_type.to_string());
            } else if let Some(data) = line.strip_prefix("data: ") {
                if !current_data.is_empty() {
                    current_data.push('\n');
                }
                current_data.push_str(data);
            }
            // Ignore other fields (id:, retry:, comments)
        }

        // Flush a final event that was not terminated by a blank line
        if current_data.is_empty() {
            Ok(None)
        } else {
            Ok(Some(SseEvent {
                event: current_event,
                data: current_data,
            }))
        }
    }
}

/// Wrap a reqwest response body as an [`SseReader`].
pub fn from_response(response: reqwest::Response) -> SseReader<impl AsyncBufRead + Unpin> {
    let byte_stream = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    SseReader::new(BufReader::new(StreamReader::new(byte_stream)))
}
