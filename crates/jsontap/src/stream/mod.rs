//! Driving a chunk source through the parser and observing the document.
//!
//! A [`JsonStream`] owns one source and drains it at most once. Every accessor
//! shares that single drain:
//!
//! - [`watch`](JsonStream::watch) yields matches of a path as soon as they are
//!   value-complete, and again whenever they change;
//! - [`watch_complete`](JsonStream::watch_complete) yields each match once,
//!   after its closing delimiter has been read;
//! - [`snapshots`](JsonStream::snapshots) yields the whole document after every
//!   chunk that changed it;
//! - [`document`](JsonStream::document) resolves to the finished document;
//! - [`select`](JsonStream::select) and its siblings navigate the finished
//!   document.
//!
//! Only one accessor drives the source at a time. A watch that is dropped early
//! hands the source back, so a later accessor resumes where it stopped.
//!
//! ```rust
//! use futures::{StreamExt, executor::block_on, stream};
//! use jsontap::JsonStream;
//!
//! let chunks = [r#"{"items": [{"id": 1}, "#, r#"{"id": 2}]}"#];
//! let json = JsonStream::new(stream::iter(chunks.map(Ok::<_, std::io::Error>)));
//!
//! let items: Vec<_> = block_on(json.watch_complete("/items/*").unwrap().collect());
//! assert_eq!(items.len(), 2);
//! ```
mod document;
mod driver;
mod node;
mod watch;

use core::{
    cell::RefCell,
    fmt,
    task::{Context, Poll, Waker},
};
use std::rc::Rc;

use futures::{Stream, StreamExt};
use tracing::debug;

pub use self::{
    document::Document,
    node::{Node, NodeKind},
    watch::Watch,
};
use self::driver::{Drain, Driver};
use crate::{
    BoxError, Chunk, CompletionTracker, ParserOptions, PointerError, Snapshot, StreamError,
    Value, completion::Completeness, pointer::Pointer,
};

/// A pull-based producer of chunks.
///
/// Implemented for every `Unpin` [`Stream`] of `Result<C, E>` where `C`
/// converts into a [`Chunk`] (`String`, `&str`, `Vec<u8>`, `Bytes`, …) and `E`
/// into a boxed error.
pub trait ChunkSource {
    /// Polls for the next chunk; `None` marks the end of input.
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Chunk, BoxError>>>;
}

impl<T, C, E> ChunkSource for T
where
    T: Stream<Item = Result<C, E>> + Unpin,
    C: Into<Chunk>,
    E: Into<BoxError>,
{
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Chunk, BoxError>>> {
        self.poll_next_unpin(cx)
            .map(|item| item.map(|chunk| chunk.map(Into::into).map_err(Into::into)))
    }
}

pub(crate) enum DrainState<S> {
    Idle(Box<Drain<S>>),
    Draining,
    Completed(Snapshot),
    Failed(StreamError),
}

impl<S> DrainState<S> {
    fn name(&self) -> &'static str {
        match self {
            DrainState::Idle(_) => "idle",
            DrainState::Draining => "draining",
            DrainState::Completed(_) => "completed",
            DrainState::Failed(_) => "failed",
        }
    }
}

/// Outcome of trying to take over the drain.
pub(crate) enum Acquire<S> {
    Driver(Driver<S>),
    Busy,
    Completed(Snapshot),
    Failed(StreamError),
}

/// Session state shared by every handle and accessor of one stream.
pub(crate) struct Shared<S> {
    state: RefCell<DrainState<S>>,
    pub(crate) tracker: RefCell<CompletionTracker>,
    latest: RefCell<Option<Snapshot>>,
    waiters: RefCell<Vec<Waker>>,
}

impl<S> Shared<S> {
    pub(crate) fn acquire(shared: &Rc<Self>) -> Acquire<S> {
        let previous = shared.state.replace(DrainState::Draining);
        match previous {
            DrainState::Idle(drain) => {
                debug!(resumed = drain.is_started(), "taking over drain");
                Acquire::Driver(Driver::new(Rc::clone(shared), drain))
            }
            DrainState::Draining => Acquire::Busy,
            DrainState::Completed(snapshot) => {
                shared
                    .state
                    .replace(DrainState::Completed(snapshot.clone()));
                Acquire::Completed(snapshot)
            }
            DrainState::Failed(err) => {
                shared.state.replace(DrainState::Failed(err.clone()));
                Acquire::Failed(err)
            }
        }
    }

    /// Leaves the draining state and wakes every accessor waiting on it.
    pub(crate) fn release(&self, next: DrainState<S>) {
        self.state.replace(next);
        for waker in self.waiters.take() {
            waker.wake();
        }
    }

    pub(crate) fn register(&self, waker: &Waker) {
        let mut waiters = self.waiters.borrow_mut();
        if !waiters.iter().any(|w| w.will_wake(waker)) {
            waiters.push(waker.clone());
        }
    }

    pub(crate) fn latest(&self) -> Option<Snapshot> {
        self.latest.borrow().clone()
    }

    pub(crate) fn set_latest(&self, snapshot: Snapshot) {
        self.latest.replace(Some(snapshot));
    }
}

/// A JSON document observed while its source is still producing it.
///
/// Handles are cheap to clone and all clones share the same source and drain.
/// The type is single-threaded: neither it nor its accessors are `Send`.
pub struct JsonStream<S> {
    shared: Rc<Shared<S>>,
}

impl<S> Clone for JsonStream<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<S> fmt::Debug for JsonStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStream")
            .field("state", &self.shared.state.borrow().name())
            .finish_non_exhaustive()
    }
}

impl<S: ChunkSource> JsonStream<S> {
    /// Wraps `source` with default parser options.
    pub fn new(source: S) -> Self {
        Self::with_options(source, ParserOptions::default())
    }

    /// Wraps `source`, parsing it with `options`.
    pub fn with_options(source: S, options: ParserOptions) -> Self {
        let drain = Box::new(Drain::new(source, options));
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(DrainState::Idle(drain)),
                tracker: RefCell::new(CompletionTracker::new()),
                latest: RefCell::new(None),
                waiters: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Streams every value-complete match of `path`.
    ///
    /// A match is yielded when it first has no member waiting for a value, and
    /// again each time it changes, so open containers are reported as they
    /// grow.
    ///
    /// # Errors
    ///
    /// Fails immediately if `path` is malformed. Errors of the drain itself
    /// are yielded by the stream.
    pub fn watch(&self, path: &str) -> Result<Watch<S>, PointerError> {
        Ok(Watch::matches(
            Rc::clone(&self.shared),
            Pointer::parse(path)?,
            Completeness::Value,
        ))
    }

    /// Streams every match of `path` once its closing delimiter has been read.
    ///
    /// # Errors
    ///
    /// Fails immediately if `path` is malformed.
    pub fn watch_complete(&self, path: &str) -> Result<Watch<S>, PointerError> {
        Ok(Watch::matches(
            Rc::clone(&self.shared),
            Pointer::parse(path)?,
            Completeness::Structural,
        ))
    }

    /// Streams the whole document after every chunk that changed it.
    pub fn snapshots(&self) -> Watch<S> {
        Watch::snapshots(Rc::clone(&self.shared))
    }

    /// Resolves to the finished document.
    ///
    /// If another accessor is draining the source, the future waits for that
    /// drain instead of starting its own.
    pub fn document(&self) -> Document<S> {
        Document::new(Rc::clone(&self.shared))
    }

    /// The document as of the latest edit, without waiting.
    ///
    /// Returns `None` until the first value has started.
    #[must_use]
    pub fn current(&self) -> Option<Value> {
        self.shared.latest().map(|snapshot| snapshot.to_value())
    }

    /// Returns `true` once the source has been fully and successfully parsed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(*self.shared.state.borrow(), DrainState::Completed(_))
    }

    /// The first node matching `path` in the finished document, or a node of
    /// kind [`NodeKind::Unknown`] when nothing matches.
    ///
    /// # Errors
    ///
    /// Fails if `path` is malformed or if draining the source fails.
    pub async fn select(&self, path: &str) -> Result<Node<S>, StreamError> {
        self.select_from(&Pointer::root(), path).await
    }

    /// The first node matching `path` in the finished document.
    ///
    /// # Errors
    ///
    /// Fails if `path` is malformed or if draining the source fails.
    pub async fn query_selector(&self, path: &str) -> Result<Option<Node<S>>, StreamError> {
        let pointer = Pointer::parse(path)?;
        Ok(self.nodes(&pointer).await?.into_iter().next())
    }

    /// Every node matching `path` in the finished document, in document order.
    ///
    /// # Errors
    ///
    /// Fails if `path` is malformed or if draining the source fails.
    pub async fn query_selector_all(&self, path: &str) -> Result<Vec<Node<S>>, StreamError> {
        let pointer = Pointer::parse(path)?;
        self.nodes(&pointer).await
    }

    pub(crate) async fn select_from(
        &self,
        base: &Pointer,
        path: &str,
    ) -> Result<Node<S>, StreamError> {
        let pointer = base.join(&Pointer::parse(path)?);
        let first = self.nodes(&pointer).await?.into_iter().next();
        Ok(first.unwrap_or_else(|| Node::unknown(self.clone(), pointer)))
    }

    pub(crate) async fn nodes(&self, pointer: &Pointer) -> Result<Vec<Node<S>>, StreamError> {
        let document = self.document().await?;
        Ok(pointer
            .find(&document)
            .into_iter()
            .map(|m| {
                Node::new(
                    self.clone(),
                    Pointer::from_path(&m.path),
                    NodeKind::of(m.node),
                )
            })
            .collect())
    }
}
