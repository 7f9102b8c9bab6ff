//! # ND-JSON Event Decoder
//!
//! Shared line-delimited JSON decoder for agent event streams.
//!
//! Both transports (HTTP daemon and one-shot CLI) emit one JSON record per
//! line. This module provides a generic decoder that handles:
//! - Line buffering from chunked byte streams
//! - Tolerant per-line parsing (malformed lines are logged and skipped)
//! - Remaining buffer processing after the stream ends
//! - Terminal-event stream termination

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio_stream::StreamExt;
use tracing::warn;

use ferry_core::AgentEvent;

use crate::errors::TransportError;
use crate::transport::AgentEventStream;

/// Split a byte stream into trimmed, non-empty lines.
///
/// This is an async generator (implemented as a stream) that:
/// 1. Buffers incoming bytes
/// 2. Splits on newlines (zero-copy, trailing `\r` stripped)
/// 3. Skips blank lines and invalid UTF-8
/// 4. Flushes any unterminated final line when the stream ends
///
/// A read error from the underlying byte stream ends the line stream; the
/// caller's terminal guard turns that into [`TransportError::Interrupted`].
pub fn split_json_lines<S>(byte_stream: S) -> impl Stream<Item = String> + Send
where
    S: Stream<Item = std::io::Result<Bytes>> + Send + Unpin + 'static,
{
    futures::stream::unfold(
        (byte_stream, BytesMut::with_capacity(8192), false),
        move |(mut stream, mut buffer, done)| async move {
            if done {
                return None;
            }

            loop {
                // Check buffer for a complete line (\n)
                if let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                    // Split the line bytes out of the buffer (zero-copy split)
                    let mut line_bytes = buffer.split_to(newline_pos + 1);
                    // Remove trailing \n
                    line_bytes.truncate(line_bytes.len() - 1);
                    // Remove trailing \r if present
                    if line_bytes.last() == Some(&b'\r') {
                        line_bytes.truncate(line_bytes.len() - 1);
                    }

                    // Convert to &str only for the final line
                    let line = match std::str::from_utf8(&line_bytes) {
                        Ok(s) => s.trim(),
                        Err(_) => continue, // skip invalid UTF-8 lines
                    };
                    if line.is_empty() {
                        continue;
                    }

                    return Some((line.to_owned(), (stream, buffer, false)));
                }

                // Read the next chunk as raw bytes, no conversion yet
                match stream.next().await {
                    Some(Ok(chunk)) => {
                        buffer.extend_from_slice(&chunk);
                    }
                    Some(Err(e)) => {
                        warn!("event stream read error: {e}");
                        return None;
                    }
                    None => {
                        // Stream ended: flush the unterminated final line
                        let line = match std::str::from_utf8(&buffer) {
                            Ok(s) => s.trim(),
                            Err(_) => return None,
                        };
                        if line.is_empty() {
                            return None;
                        }
                        let line = line.to_owned();
                        buffer.clear();
                        return Some((line, (stream, buffer, true)));
                    }
                }
            }
        },
    )
}

/// Parse one line as an [`AgentEvent`].
///
/// Returns `None` (with a warning) for lines the agent emits that this layer
/// does not understand. Unknown records are never fatal to the turn.
#[must_use]
pub fn parse_event_line(line: &str) -> Option<AgentEvent> {
    match serde_json::from_str::<AgentEvent>(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(line = %line, error = %e, "discarding undecodable agent event line");
            None
        }
    }
}

/// Cut an event stream after its first terminal item.
///
/// The returned stream ends immediately after yielding a terminal
/// [`AgentEvent`] or any error, without polling the inner stream again.
/// Trailing records after a terminal event are therefore never surfaced.
pub fn take_until_terminal<S>(events: S) -> AgentEventStream
where
    S: Stream<Item = Result<AgentEvent, TransportError>> + Send + Unpin + 'static,
{
    Box::pin(futures::stream::unfold(
        (events, false),
        |(mut events, done)| async move {
            if done {
                return None;
            }
            let item = events.next().await?;
            let ends = match &item {
                Ok(event) => event.is_terminal(),
                Err(_) => true,
            };
            Some((item, (events, ends)))
        },
    ))
}

/// Decode a raw byte stream into a guarded [`AgentEventStream`].
///
/// Malformed lines are skipped. The stream ends at the first terminal event;
/// if the bytes run out before one arrives, the final item is
/// [`TransportError::Interrupted`].
pub fn decode_event_stream<S>(byte_stream: S) -> AgentEventStream
where
    S: Stream<Item = std::io::Result<Bytes>> + Send + Unpin + 'static,
{
    let events = split_json_lines(byte_stream)
        .filter_map(|line| parse_event_line(&line))
        .map(Ok)
        .chain(tokio_stream::once(Err(TransportError::Interrupted)));
    take_until_terminal(Box::pin(events))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
