//! Turning vendor message streams into document text.
//!
//! Streaming APIs rarely send the JSON document itself. They send a sequence
//! of envelopes, each carrying the next fragment of the document somewhere
//! inside (`/choices/0/delta/content`, `/delta/partial_json`, …).
//! [`content_chunks`] pulls those fragments out so the result can be handed to
//! [`JsonStream`](crate::JsonStream) directly.
//!
//! ```rust
//! use futures::{StreamExt, executor::block_on, stream};
//! use jsontap::{JsonStream, Pointer, adapter::{content_chunks, text_at}, sse::json_payloads};
//!
//! let body = concat!(
//!     "data: {\"delta\": \"{\\\"ok\\\": \"}\n\n",
//!     "data: {\"delta\": \"true}\"}\n\n",
//!     "data: [DONE]\n\n",
//! );
//! let payloads = json_payloads(stream::iter([Ok::<_, std::io::Error>(body)]));
//! let chunks = content_chunks(payloads, text_at(Pointer::parse("/delta").unwrap()), |_| false);
//! let json = JsonStream::new(Box::pin(chunks));
//! let ok: Vec<_> = block_on(json.watch("/ok").unwrap().collect());
//! assert_eq!(ok.len(), 1);
//! ```
use futures::{Stream, StreamExt, future::ready};

use crate::{Chunk, Pointer, Value};

/// Maps a stream of messages to the text chunks they carry.
///
/// `extract` returns the fragment a message contributes, if any. The stream
/// ends after the first message for which `stop` returns `true`; that
/// message's own fragment is still yielded. An error is yielded once and
/// ends the stream as well.
pub fn content_chunks<S, M, E, X, P>(
    messages: S,
    mut extract: X,
    mut stop: P,
) -> impl Stream<Item = Result<Chunk, E>>
where
    S: Stream<Item = Result<M, E>>,
    X: FnMut(&M) -> Option<String>,
    P: FnMut(&M) -> bool,
{
    messages
        .scan(false, move |stopped, message| {
            if *stopped {
                return ready(None);
            }
            let item = match message {
                Ok(message) => {
                    *stopped = stop(&message);
                    Ok(extract(&message))
                }
                Err(err) => {
                    *stopped = true;
                    Err(err)
                }
            };
            ready(Some(item))
        })
        .filter_map(|item| {
            ready(match item {
                Ok(Some(text)) if !text.is_empty() => Some(Ok(Chunk::Text(text))),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            })
        })
}

/// Extractor for [`content_chunks`] reading the string found at `pointer`.
///
/// Messages without a string there contribute nothing.
pub fn text_at(pointer: Pointer) -> impl FnMut(&Value) -> Option<String> {
    move |message| {
        pointer
            .find(message)
            .into_iter()
            .find_map(|found| found.node.as_str().map(str::to_string))
    }
}
