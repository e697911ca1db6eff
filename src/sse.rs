//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns the raw byte stream of a streaming chat completion into
//! [`StreamChunk`]s.  Events are separated by blank lines; each `data:`
//! payload is a JSON object whose first choice carries a `delta`, and the
//! literal payload `[DONE]` ends the stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::StreamChunk;

/// Payload that ends a stream.
const DONE: &str = "[DONE]";

#[derive(Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: StreamChunk,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
}

/// What one complete event in the buffer amounts to.
#[derive(Debug)]
enum Event {
    Chunk(Result<StreamChunk>),
    Done,
    Skip,
}

/// Process a stream of bytes into a stream of chunks.
///
/// Events may arrive split across, or packed into, network reads; they are
/// buffered until complete.  The resulting stream ends at `[DONE]` or when
/// the byte stream ends, whichever comes first.
pub fn process_sse<S, E>(byte_stream: S) -> impl Stream<Item = Result<StreamChunk>>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    // Convert transport errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    // Use a state machine to process the SSE stream
    let buffer: Vec<u8> = Vec::new();
    let done = false;

    stream::unfold(
        (stream, buffer, done),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }
            loop {
                // First check if we have a complete event in the buffer
                while let Some((event, remaining)) = extract_event(&buffer) {
                    buffer = remaining;
                    match event {
                        Event::Chunk(chunk) => return Some((chunk, (stream, buffer, false))),
                        Event::Done => return None,
                        Event::Skip => {}
                    }
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => buffer.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, true)));
                    }
                    None => {
                        // End of stream; a final event may lack its blank line
                        if buffer.iter().all(u8::is_ascii_whitespace) {
                            return None;
                        }
                        buffer.extend_from_slice(b"\n\n");
                        if let Some((Event::Chunk(chunk), _)) = extract_event(&buffer) {
                            return Some((chunk, (stream, Vec::new(), true)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Find the end of the first event: the index of the blank line and its length.
fn find_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Extract a complete SSE event from a buffer.
fn extract_event(buffer: &[u8]) -> Option<(Event, Vec<u8>)> {
    let (end, separator) = find_boundary(buffer)?;
    let rest = buffer[end + separator..].to_vec();

    let event_text = match std::str::from_utf8(&buffer[..end]) {
        Ok(text) => text,
        Err(e) => return Some((Event::Chunk(Err(e.into())), rest)),
    };

    // Collect the data lines; comments and other fields are ignored
    let mut data: Option<String> = None;
    for line in event_text.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(payload) = line.strip_prefix("data:") {
            let payload = payload.strip_prefix(' ').unwrap_or(payload);
            match data.as_mut() {
                Some(data) => {
                    data.push('\n');
                    data.push_str(payload);
                }
                None => data = Some(payload.to_string()),
            }
        }
    }

    let event = match data.as_deref().map(str::trim) {
        None | Some("") => Event::Skip,
        Some(DONE) => Event::Done,
        Some(json) => parse_payload(json),
    };
    Some((event, rest))
}

/// Parse one `data:` payload.
fn parse_payload(json: &str) -> Event {
    let parsed = match serde_json::from_str::<CompletionChunk>(json) {
        Ok(parsed) => parsed,
        Err(e) => {
            return Event::Chunk(Err(Error::serialization(
                format!("Failed to parse event JSON: {e}"),
                Some(Box::new(e)),
            )));
        }
    };
    if let Some(error) = parsed.error {
        return Event::Chunk(Err(Error::api(
            500,
            Some(error.error_type.unwrap_or_else(|| "stream_error".to_string())),
            error.message.unwrap_or_else(|| json.to_string()),
        )));
    }
    match parsed.choices.into_iter().next() {
        Some(choice) => Event::Chunk(Ok(choice.delta)),
        None => Event::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use futures::stream;

    fn bytes_stream(
        parts: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Unpin {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p))))
    }

    async fn collect(parts: Vec<&'static [u8]>) -> Vec<Result<StreamChunk>> {
        process_sse(bytes_stream(parts)).collect().await
    }

    #[tokio::test]
    async fn parse_role_and_content() {
        let data: &[u8] = b"data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n\
data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"}}]}\n\n\
data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n\
data: [DONE]\n\n";
        let chunks: Vec<_> = collect(vec![data])
            .await
            .into_iter()
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(
            chunks,
            vec![
                StreamChunk::role(Role::Assistant),
                StreamChunk::content("Hi"),
                StreamChunk::default(),
            ]
        );
    }

    #[tokio::test]
    async fn handle_split_event() {
        // Simulate an event split across multiple chunks, mid-character
        let chunks = collect(vec![
            &b"data: {\"choices\":[{\"delta\":{\"content\":\"caf\xc3"[..],
            &b"\xa9\"}}]}\n"[..],
            &b"\n"[..],
        ])
        .await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &StreamChunk::content("café"));
    }

    #[tokio::test]
    async fn done_ends_the_stream() {
        let chunks = collect(vec![
            &b"data: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n"[..],
        ])
        .await;
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn comments_and_empty_choices_are_skipped() {
        let chunks = collect(vec![
            &b": keep-alive\n\n"[..],
            &b"data: {\"choices\":[]}\n\n"[..],
            &b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\r\n\r\n"[..],
        ])
        .await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &StreamChunk::content("x"));
    }

    #[tokio::test]
    async fn handle_error_payload() {
        let chunks = collect(vec![
            &b"data: {\"error\":{\"type\":\"server_error\",\"message\":\"overloaded\"}}\n\n"[..],
        ])
        .await;
        let err = chunks[0].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "server_error: overloaded");
    }

    #[tokio::test]
    async fn handle_malformed_event() {
        let chunks = collect(vec![&b"data: {not json\n\n"[..]]).await;
        assert!(matches!(chunks[0], Err(Error::Serialization { .. })));
    }

    #[tokio::test]
    async fn trailing_event_without_blank_line() {
        let chunks = collect(vec![&b"data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}"[..]]).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &StreamChunk::content("end"));
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let parts: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n\n")),
        ];
        let chunks: Vec<_> = process_sse(stream::iter(parts)).collect().await;
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert!(matches!(chunks[1], Err(Error::Streaming { .. })));
    }
}
