//! Observe a JSON document while it is still arriving.
//!
//! `jsontap` parses JSON that comes in fragments of any size (a network body,
//! a model's streamed output) and lets you react to parts of the document as
//! soon as they are available:
//!
//! - [`StreamingParser`] is the resumable parser. It takes fragments split
//!   anywhere, even inside an escape or a multi-byte character, and records an
//!   immutable [`Snapshot`] of the document after every edit.
//! - [`Pointer`] is a JSON Pointer with `*` wildcards, matched against partial
//!   documents.
//! - [`JsonStream`] drives a chunk source and exposes eager and gated
//!   watches, the finished document and node navigation.
//!
//! ```rust
//! use futures::{StreamExt, executor::block_on, stream};
//! use jsontap::{JsonStream, Value};
//!
//! let source = stream::iter(
//!     [r#"{"mixed": [1, "str"#, r#"ing", {"obj": true}, null]}"#].map(Ok::<_, std::io::Error>),
//! );
//! let json = JsonStream::new(source);
//! let values: Vec<Value> =
//!     block_on(json.watch_complete("/mixed/*").unwrap().map(Result::unwrap).collect());
//! assert_eq!(values.len(), 4);
//! assert_eq!(values[3], Value::Null);
//! ```

mod chunk;
mod completion;
mod error;
mod options;
mod parser;
mod pointer;
mod stream;
mod tree;
mod value;

#[cfg(feature = "sse")]
pub mod adapter;
#[cfg(feature = "sse")]
pub mod sse;

#[cfg(test)]
mod tests;

#[doc(hidden)]
pub use chunk::produce_chunks;
pub use chunk::{Chunk, ChunkDecoder};
pub use completion::{Completeness, CompletionTracker};
pub use error::{BoxError, ParserError, PointerError, StreamError, SyntaxError};
pub use options::ParserOptions;
pub use parser::{StreamingParser, from_str};
#[doc(hidden)]
pub use pointer::PathItemFrom;
pub use pointer::{Match, PathItem, Pointer, Segment, Traverse};
pub use stream::{ChunkSource, Document, JsonStream, Node, NodeKind, Watch};
pub use tree::{ContainerId, Snapshot, Update};
pub use value::{Array, Map, Value};

/// Macro to build a `Vec<PathItem>` from a heterogeneous list of keys and
/// indices.
///
/// ```rust
/// # use jsontap::{path, PathItem};
/// let p = path![0, "foo", 2];
/// assert_eq!(
///     p,
///     vec![
///         PathItem::Index(0),
///         PathItem::Key("foo".into()),
///         PathItem::Index(2)
///     ]
/// );
/// ```
#[macro_export]
macro_rules! path {
    () => {
        ::std::vec::Vec::<$crate::PathItem>::new()
    };
    ( $( $elem:expr ),+ $(,)? ) => {{
        use $crate::PathItemFrom;
        ::std::vec![$($crate::PathItem::from_path_item($elem)),+]
    }};
}
