//! Property-based tests for the SSE stream reader
//!
//! Transport chunk boundaries never line up with event boundaries. These
//! tests render event streams, re-chunk the bytes at arbitrary points, and
//! expect the reader to recover identical events every time.

use super::stream::SseReader;
use axum::body::Bytes;
use futures::stream;
use proptest::prelude::*;
use tokio::io::BufReader;
use tokio_util::io::StreamReader;

/// Payload text for one `data:` line.
fn arb_payload() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 {}:,._-]{1,40}"
}

fn render(payloads: &[String]) -> String {
    let mut out = String::new();
    for payload in payloads {
        out.push_str("data: ");
        out.push_str(payload);
        out.push_str("\n\n");
    }
    out
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Parse `text` delivered in chunks cut from the repeating `sizes` pattern.
async fn parse_chunked(text: &str, sizes: &[usize]) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut pos = 0;
    let mut next_size = sizes.iter().copied().cycle();
    while pos < bytes.len() {
        let take = next_size.next().unwrap_or(1).clamp(1, bytes.len() - pos);
        chunks.push(Bytes::copy_from_slice(&bytes[pos..pos + take]));
        pos += take;
    }

    let transport = StreamReader::new(stream::iter(
        chunks.into_iter().map(Ok::<_, std::io::Error>),
    ));
    let mut reader = SseReader::new(BufReader::new(transport));

    let mut events = Vec::new();
    while let Some(event) = reader.next_event().await.unwrap() {
        events.push(event.data);
    }
    events
}

proptest! {
    #[test]
    fn prop_chunk_boundaries_never_change_events(
        payloads in proptest::collection::vec(arb_payload(), 1..8),
        sizes in proptest::collection::vec(1..16usize, 1..8),
    ) {
        let text = render(&payloads);
        let parsed = block_on(parse_chunked(&text, &sizes));
        prop_assert_eq!(parsed, payloads);
    }

    #[test]
    fn prop_noise_lines_are_ignored(
        payloads in proptest::collection::vec(arb_payload(), 1..6),
        noise_pick in 0..3usize,
    ) {
        let noise = [": keep-alive", "retry: 250", "id: 41"][noise_pick];
        let mut text = String::new();
        for payload in &payloads {
            text.push_str(noise);
            text.push('\n');
            text.push_str("data: ");
            text.push_str(payload);
            text.push_str("\n\n");
        }

        let parsed = block_on(parse_chunked(&text, &[7]));
        prop_assert_eq!(parsed, payloads);
    }

    #[test]
    fn prop_multiline_data_joins_with_newlines(
        lines in proptest::collection::vec(arb_payload(), 2..5),
        sizes in proptest::collection::vec(1..16usize, 1..4),
    ) {
        let mut text = String::new();
        for line in &lines {
            text.push_str("data: ");
            text.push_str(line);
            text.push('\n');
        }
        text.push('\n');

        let parsed = block_on(parse_chunked(&text, &sizes));
        prop_assert_eq!(parsed, vec![lines.join("\n")]);
    }

    #[test]
    fn prop_event_names_ride_along(
        name in "[a-z]{3,10}",
        payload in arb_payload(),
    ) {
        let text = format!("event: {name}\ndata: {payload}\n\n");
        let events = block_on(async {
            let mut reader = SseReader::new(text.as_bytes());
            let mut events = Vec::new();
            while let Some(event) = reader.next_event().await.unwrap() {
                events.push(event);
            }
            events
        });

        prop_assert_eq!(events.len(), 1);
        prop_assert_eq!(events[0].event.as_deref(), Some(name.as_str()));
        prop_assert_eq!(&events[0].data, &payload);
    }
}
