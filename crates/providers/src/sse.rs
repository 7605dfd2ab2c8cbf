//! Line protocol for streamed completions.
//!
//! The body is newline-delimited. Each non-blank line is either
//! `data: {json}`, a bare `{json}` event, or the `data: [DONE]` sentinel.
//! Lines that are not valid events are skipped: some servers interleave
//! keep-alive noise, and one bad line must not end a healthy stream.

use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use notechat_core::{Error, Result};

use crate::types::StreamChunk;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// What a single line means to the accumulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// Blank or undecodable line
    Skip,
    /// End of the reply
    Done,
    /// Text to append (may be empty)
    Delta(String),
}

/// Classify one line of the response body
pub fn parse_line(line: &str) -> LineEvent {
    let line = line.trim();
    if line.is_empty() {
        return LineEvent::Skip;
    }

    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
    if payload == DONE_SENTINEL {
        return LineEvent::Done;
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => match chunk.choices.into_iter().next() {
            Some(choice) => LineEvent::Delta(choice.delta.and_then(|d| d.content).unwrap_or_default()),
            None => {
                tracing::debug!("skipping stream event without choices");
                LineEvent::Skip
            }
        },
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed stream line");
            LineEvent::Skip
        }
    }
}

/// Splits a byte stream into lines across arbitrary chunk boundaries
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            lines.push(decode_line(&line_bytes[..pos]));
        }
        lines
    }

    /// Whatever is left after the body ended without a final newline
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Turn a response body into cumulative reply snapshots.
///
/// Yields the whole reply so far after every delta. Ends at `[DONE]` or at
/// end of body. A transport error is yielded once and ends the stream.
pub fn snapshots<S, E>(body: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = LineDecoder::new();
        let mut reply = String::new();
        let mut count = 0usize;

        'read: loop {
            match body.next().await {
                Some(Ok(chunk)) => {
                    for line in decoder.push(&chunk) {
                        match parse_line(&line) {
                            LineEvent::Skip => {}
                            LineEvent::Done => break 'read,
                            LineEvent::Delta(piece) => {
                                reply.push_str(&piece);
                                count += 1;
                                yield Ok(reply.clone());
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    let message = e.to_string();
                    tracing::warn!(error = %message, snapshots = count, "completion stream failed");
                    yield Err(Error::Transport(message));
                    return;
                }
                None => {
                    let last = decoder.finish().map(|line| parse_line(&line));
                    if let Some(LineEvent::Delta(piece)) = last {
                        reply.push_str(&piece);
                        count += 1;
                        yield Ok(reply.clone());
                    }
                    break 'read;
                }
            }
        }

        tracing::debug!(snapshots = count, chars = reply.chars().count(), "completion stream finished");
    }
}
