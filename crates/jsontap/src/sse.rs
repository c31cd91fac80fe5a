//! Event-stream framing for model and API responses.
//!
//! Most streaming endpoints wrap their payloads in `text/event-stream`
//! messages. [`SseDecoder`] turns raw chunks back into [`SseMessage`]s, and
//! [`data_payloads`] reduces a byte stream to the JSON text carried in each
//! message's `data` field.
//!
//! ```rust
//! use futures::{StreamExt, executor::block_on, stream};
//! use jsontap::sse::data_payloads;
//!
//! let body = ["data: {\"a\"", ": 1}\n\nda", "ta: [DONE]\n\n"];
//! let payloads: Vec<_> =
//!     block_on(data_payloads(stream::iter(body.map(Ok::<_, std::io::Error>))).collect());
//! assert_eq!(payloads.len(), 1);
//! assert_eq!(payloads[0].as_ref().unwrap(), "{\"a\": 1}");
//! ```
use std::{mem, sync::Arc};

use futures::{Stream, StreamExt, future::ready, stream};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{BoxError, Chunk, ChunkDecoder, ParserError, Value, from_str};

/// `data` values that mark the end of a stream rather than carry a payload.
const SENTINELS: [&str; 3] = ["[DONE]", "DONE", "[END]"];

/// Errors produced while reading an event stream.
#[derive(Debug, Error, Clone)]
pub enum SseError {
    /// The byte source failed.
    #[error("source error: {0}")]
    Source(Arc<dyn std::error::Error + Send + Sync + 'static>),
    /// A message's `data` did not parse as one JSON document.
    #[error("message data is not valid JSON: {0}")]
    InvalidJson(#[from] ParserError),
}

impl SseError {
    fn from_source(err: BoxError) -> Self {
        Self::Source(Arc::from(err))
    }
}

/// One dispatched event-stream message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseMessage {
    /// The `event` field, if the message named one.
    pub event: Option<String>,
    /// The `id` field, if present.
    pub id: Option<String>,
    /// The reconnection delay in milliseconds, if a valid `retry` field was
    /// sent.
    pub retry: Option<u64>,
    /// Every `data` line of the message, joined with `\n`.
    pub data: String,
}

/// Incremental decoder for `text/event-stream` bodies.
///
/// Chunks may split lines, line endings and multi-byte characters anywhere.
#[derive(Debug, Default)]
pub struct SseDecoder {
    text: ChunkDecoder,
    line: String,
    /// The previous chunk ended in `\r`, so a leading `\n` belongs to it.
    after_cr: bool,
    message: SseMessage,
    /// Whether any field was read since the last dispatch.
    dirty: bool,
    data_lines: usize,
}

impl SseDecoder {
    /// A decoder at the start of a stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the messages it completed.
    pub fn feed(&mut self, chunk: impl Into<Chunk>) -> Vec<SseMessage> {
        let text = self.text.normalize(chunk.into());
        self.consume(&text)
    }

    /// Ends the input, dispatching a final message that lacks its blank line.
    pub fn finish(&mut self) -> Option<SseMessage> {
        let tail = self.text.finish();
        self.line.push_str(&tail);
        if !self.line.is_empty() {
            let line = mem::take(&mut self.line);
            self.field(&line);
        }
        self.after_cr = false;
        self.dispatch()
    }

    fn consume(&mut self, text: &str) -> Vec<SseMessage> {
        let mut out = Vec::new();
        for c in text.chars() {
            let after_cr = mem::replace(&mut self.after_cr, c == '\r');
            match c {
                '\n' if after_cr => {}
                '\r' | '\n' => {
                    let line = mem::take(&mut self.line);
                    if line.is_empty() {
                        out.extend(self.dispatch());
                    } else {
                        self.field(&line);
                    }
                }
                c => self.line.push(c),
            }
        }
        out
    }

    fn field(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match name {
            "data" => {
                if self.data_lines > 0 {
                    self.message.data.push('\n');
                }
                self.message.data.push_str(value);
                self.data_lines += 1;
            }
            "event" => self.message.event = Some(value.to_string()),
            "id" => self.message.id = Some(value.to_string()),
            "retry" => match value.parse() {
                Ok(retry) if value.bytes().all(|b| b.is_ascii_digit()) => {
                    self.message.retry = Some(retry);
                }
                _ => return,
            },
            _ => return,
        }
        self.dirty = true;
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        if !mem::take(&mut self.dirty) {
            return None;
        }
        self.data_lines = 0;
        let message = mem::take(&mut self.message);
        trace!(event = ?message.event, len = message.data.len(), "sse message");
        Some(message)
    }
}

/// Decodes a chunk stream into event-stream messages.
///
/// A source error is passed through as [`SseError::Source`]; decoding resumes
/// with the next chunk.
pub fn messages<S, C, E>(source: S) -> impl Stream<Item = Result<SseMessage, SseError>>
where
    S: Stream<Item = Result<C, E>>,
    C: Into<Chunk>,
    E: Into<BoxError>,
{
    let mut decoder = SseDecoder::new();
    source
        .map(Some)
        .chain(stream::iter([None]))
        .flat_map(move |item| {
            let batch: Vec<_> = match item {
                Some(Ok(chunk)) => decoder.feed(chunk).into_iter().map(Ok).collect(),
                Some(Err(err)) => vec![Err(SseError::from_source(err.into()))],
                None => decoder.finish().into_iter().map(Ok).collect(),
            };
            stream::iter(batch)
        })
}

/// Streams the `data` text of every message that carries a JSON payload.
///
/// Messages with empty data and end-of-stream sentinels (`[DONE]`, `DONE`,
/// `[END]`) are skipped.
///
/// # Errors
///
/// Each payload is parsed once; one that is not a complete JSON document
/// yields [`SseError::InvalidJson`].
pub fn data_payloads<S, C, E>(source: S) -> impl Stream<Item = Result<String, SseError>>
where
    S: Stream<Item = Result<C, E>>,
    C: Into<Chunk>,
    E: Into<BoxError>,
{
    payloads(source).map(|payload| payload.map(|(text, _)| text))
}

/// Like [`data_payloads`], yielding the parsed payloads.
pub fn json_payloads<S, C, E>(source: S) -> impl Stream<Item = Result<Value, SseError>>
where
    S: Stream<Item = Result<C, E>>,
    C: Into<Chunk>,
    E: Into<BoxError>,
{
    payloads(source).map(|payload| payload.map(|(_, value)| value))
}

fn payloads<S, C, E>(source: S) -> impl Stream<Item = Result<(String, Value), SseError>>
where
    S: Stream<Item = Result<C, E>>,
    C: Into<Chunk>,
    E: Into<BoxError>,
{
    messages(source).filter_map(|message| {
        ready(match message {
            Err(err) => Some(Err(err)),
            Ok(SseMessage { data, .. }) => {
                let trimmed = data.trim();
                if trimmed.is_empty() {
                    None
                } else if SENTINELS.contains(&trimmed) {
                    debug!(sentinel = trimmed, "skipping end-of-stream marker");
                    None
                } else {
                    Some(
                        from_str(&data)
                            .map(|value| (data, value))
                            .map_err(SseError::InvalidJson),
                    )
                }
            }
        })
    })
}
