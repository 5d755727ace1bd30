//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! This module turns the raw byte stream of a completion response into
//! [`StreamEvent`]s, handling SSE framing, buffering across chunks, and
//! error conditions.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::STREAM_BYTES;
use crate::types::{ContentBlockDelta, ContentBlockDeltaEvent, MessageStartEvent, StreamEvent};
use crate::{Error, Result};

/// Process a stream of bytes into a stream of [`StreamEvent`]s.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + Send + 'static,
{
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });
    process_frames(stream)
}

/// Frame an already error-mapped byte stream.
pub(crate) fn process_frames<S>(stream: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = Result<Bytes>> + Unpin + Send + 'static,
{
    let stream = stream.fuse();
    let buffer = String::new();
    let pending: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer, pending),
        move |(mut stream, mut buffer, mut pending)| async move {
            loop {
                // First check if we have a complete event in the buffer
                if let Some((event, remaining)) = extract_event(&buffer) {
                    buffer = remaining;
                    return Some((event, (stream, buffer, pending)));
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        pending.extend_from_slice(&bytes);
                        match decode_utf8(&mut pending) {
                            Ok(text) => {
                                buffer.push_str(&text);
                                if buffer.contains("\r\n") {
                                    buffer = buffer.replace("\r\n", "\n");
                                }
                            }
                            Err(e) => return Some((Err(e), (stream, buffer, pending))),
                        }
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer, pending)));
                    }
                    None => {
                        if !pending.is_empty() {
                            pending.clear();
                            return Some((
                                Err(Error::encoding(
                                    "Invalid UTF-8 in stream: truncated character at end of stream",
                                    None,
                                )),
                                (stream, buffer, pending),
                            ));
                        }
                        // A final event without its trailing blank line.
                        if !buffer.trim().is_empty() {
                            buffer.push_str("\n\n");
                            if let Some((event, _)) = extract_event(&buffer) {
                                return Some((event, (stream, String::new(), pending)));
                            }
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Decode the longest valid UTF-8 prefix of `pending`.
///
/// A character cut off at the end stays in `pending` until the next chunk
/// completes it.
fn decode_utf8(pending: &mut Vec<u8>) -> Result<String> {
    let checked = std::str::from_utf8(pending).map(str::len);
    let valid = match checked {
        Ok(len) => len,
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(e) => {
            pending.clear();
            return Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            ));
        }
    };
    let rest = pending.split_off(valid);
    let bytes = std::mem::replace(pending, rest);
    String::from_utf8(bytes)
        .map_err(|e| Error::encoding(format!("Invalid UTF-8 in stream: {e}"), Some(Box::new(e))))
}

/// Extract a complete SSE event from a buffer string.
///
/// Events are delimited by a blank line; each has an `event:` line followed
/// by a `data:` line.
fn extract_event(buffer: &str) -> Option<(Result<StreamEvent>, String)> {
    let (event_text, rest) = buffer.split_once("\n\n")?;
    let rest = rest.to_string();

    let Some((event_type, event_data)) = event_text.split_once('\n') else {
        return Some((
            Err(Error::serialization(
                format!("Malformed SSE event: missing newline separator in '{event_text}'"),
                None,
            )),
            rest,
        ));
    };

    let Some(tag) = event_type.strip_prefix("event:").map(str::trim) else {
        return Some((
            Err(Error::serialization(
                format!("Malformed SSE event: missing 'event:' prefix in '{event_type}'"),
                None,
            )),
            rest,
        ));
    };

    let Some(event_data) = event_data.strip_prefix("data:").map(str::trim) else {
        return Some((
            Err(Error::serialization(
                format!("Malformed SSE event: missing 'data:' prefix in '{event_data}'"),
                None,
            )),
            rest,
        ));
    };

    Some((parse_event_type(tag, event_data), rest))
}

/// Parse a specific SSE event type and its data.
fn parse_event_type(tag: &str, event_data: &str) -> Result<StreamEvent> {
    match tag {
        "message_start" => {
            let event: MessageStartEvent = serde_json::from_str(event_data)?;
            Ok(StreamEvent::TurnStarted {
                role: event.message.role,
            })
        }

        "content_block_delta" => {
            let event: ContentBlockDeltaEvent = serde_json::from_str(event_data)?;
            match event.delta {
                ContentBlockDelta::TextDelta(delta) => Ok(StreamEvent::TextDelta {
                    fragment: delta.text,
                }),
                ContentBlockDelta::Other => Ok(StreamEvent::unknown(tag)),
            }
        }

        "error" => Err(Error::api(
            500,
            Some("stream_error".to_string()),
            event_data.to_string(),
            None,
        )),

        _ => Ok(StreamEvent::unknown(tag)),
    }
}
