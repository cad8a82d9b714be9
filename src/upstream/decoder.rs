//! Incremental decoding of the upstream event stream
//!
//! The upstream delivers completions as chunked `data: `-framed events.
//! The decoder strips the framing per chunk and yields the incremental
//! content deltas as plain text fragments, in arrival order. Chunk
//! boundaries are assumed to align with complete events; an event split
//! across chunks surfaces as a decode error rather than silent corruption.

use crate::upstream::models::ChatCompletionChunk;
use bytes::Bytes;
use futures::{future, stream, Stream, StreamExt};

/// Length of the leading `data: ` field marker
const FIELD_MARKER_LEN: usize = 6;

/// Delimiter between events within a chunk
const EVENT_DELIMITER: &str = "\n\ndata: ";

/// Sentinel segment that signals stream completion
const DONE_SENTINEL: &str = "[DONE]";

/// Fatal streaming-protocol violations
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("stream chunk is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("malformed stream event: {0}")]
    MalformedEvent(String),

    #[error("stream event carries no choices")]
    MissingChoices,
}

/// Per-chunk event-stream decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamDecoder;

impl StreamDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one raw chunk into its text fragments
    ///
    /// Framing (the leading field marker, event delimiters, surrounding
    /// whitespace, empty segments, and the terminal sentinel) is discarded;
    /// every remaining segment must parse as a completion event. A malformed
    /// segment fails the whole chunk.
    pub fn decode_chunk(&self, chunk: &[u8]) -> Result<Vec<String>, DecodeError> {
        let text = std::str::from_utf8(chunk)?;
        let payload = text.get(FIELD_MARKER_LEN..).unwrap_or("");

        let mut fragments = Vec::new();
        for segment in payload.split(EVENT_DELIMITER) {
            let segment = segment.trim();
            if segment.is_empty() || segment == DONE_SENTINEL {
                continue;
            }

            let event: ChatCompletionChunk = serde_json::from_str(segment)
                .map_err(|e| DecodeError::MalformedEvent(e.to_string()))?;
            let choice = event
                .choices
                .into_iter()
                .next()
                .ok_or(DecodeError::MissingChoices)?;

            if let Some(content) = choice.delta.content {
                if !content.is_empty() {
                    fragments.push(content);
                }
            }
        }

        Ok(fragments)
    }
}

/// Lift the per-chunk decoder over a byte-chunk stream
///
/// Fragments are yielded in arrival order. The first error (transport or
/// decode) is yielded once and terminates the stream; nothing is skipped
/// or guessed past it.
pub fn decode_stream<S, E>(chunks: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: From<DecodeError>,
{
    let decoder = StreamDecoder::new();

    chunks
        .map(move |chunk| match chunk {
            Ok(bytes) => match decoder.decode_chunk(&bytes) {
                Ok(fragments) => fragments.into_iter().map(Ok).collect(),
                Err(e) => vec![Err(E::from(e))],
            },
            Err(e) => vec![Err(e)],
        })
        .flat_map(stream::iter)
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            if item.is_err() {
                *failed = true;
            }
            future::ready(Some(item))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn event(content: &str) -> String {
        format!(r#"{{"choices":[{{"delta":{{"content":"{}"}}}}]}}"#, content)
    }

    #[test]
    fn test_decode_single_event() {
        let decoder = StreamDecoder::new();
        let chunk = format!("data: {}\n\n", event("Hello"));
        let fragments = decoder.decode_chunk(chunk.as_bytes()).unwrap();
        assert_eq!(fragments, vec!["Hello"]);
    }

    #[test]
    fn test_decode_multiple_events_in_chunk() {
        let decoder = StreamDecoder::new();
        let chunk = format!(
            "data: {}\n\ndata: {}\n\ndata: {}\n\n",
            event("Hel"),
            event("lo"),
            event(" world")
        );
        let fragments = decoder.decode_chunk(chunk.as_bytes()).unwrap();
        assert_eq!(fragments, vec!["Hel", "lo", " world"]);
    }

    #[test]
    fn test_decode_skips_done_sentinel() {
        let decoder = StreamDecoder::new();
        let chunk = format!("data: {}\n\ndata: [DONE]\n\n", event("bye"));
        let fragments = decoder.decode_chunk(chunk.as_bytes()).unwrap();
        assert_eq!(fragments, vec!["bye"]);
    }

    #[test]
    fn test_decode_skips_empty_deltas() {
        let decoder = StreamDecoder::new();
        let chunk = format!(
            "data: {{\"choices\":[{{\"delta\":{{\"role\":\"assistant\"}}}}]}}\n\ndata: {}\n\n",
            event("hi")
        );
        let fragments = decoder.decode_chunk(chunk.as_bytes()).unwrap();
        assert_eq!(fragments, vec!["hi"]);
    }

    #[test]
    fn test_decode_malformed_event_is_fatal() {
        let decoder = StreamDecoder::new();
        let chunk = b"data: {not json}\n\n";
        let result = decoder.decode_chunk(chunk);
        assert!(matches!(result, Err(DecodeError::MalformedEvent(_))));
    }

    #[test]
    fn test_decode_event_without_choices() {
        let decoder = StreamDecoder::new();
        let chunk = b"data: {\"choices\":[]}\n\n";
        let result = decoder.decode_chunk(chunk);
        assert!(matches!(result, Err(DecodeError::MissingChoices)));
    }

    #[test]
    fn test_decode_done_only_chunk() {
        let decoder = StreamDecoder::new();
        let fragments = decoder.decode_chunk(b"data: [DONE]\n\n").unwrap();
        assert!(fragments.is_empty());
    }

    #[tokio::test]
    async fn test_stream_round_trip_preserves_order() {
        let chunks: Vec<Result<Bytes, DecodeError>> = vec![
            Ok(Bytes::from(format!(
                "data: {}\n\ndata: {}\n\n",
                event("The answer"),
                event(" is")
            ))),
            Ok(Bytes::from(format!("data: {}\n\n", event(" 42.")))),
            Ok(Bytes::from("data: [DONE]\n\n")),
        ];

        let fragments: Vec<String> = decode_stream(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(fragments.concat(), "The answer is 42.");
        assert_eq!(fragments.len(), 3);
    }

    #[tokio::test]
    async fn test_stream_terminates_after_error() {
        let chunks: Vec<Result<Bytes, DecodeError>> = vec![
            Ok(Bytes::from(format!("data: {}\n\n", event("ok")))),
            Ok(Bytes::from("data: {broken\n\n")),
            Ok(Bytes::from(format!("data: {}\n\n", event("never seen")))),
        ];

        let items: Vec<Result<String, DecodeError>> =
            decode_stream(stream::iter(chunks)).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "ok");
        assert!(items[1].is_err());
    }
}
