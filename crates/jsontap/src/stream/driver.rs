use core::task::{Context, Poll, ready};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::{ChunkSource, DrainState, Shared};
use crate::{
    ChunkDecoder, ParserOptions, Snapshot, StreamError, StreamingParser, tree::Update,
};

/// The source together with everything needed to resume parsing it.
pub(crate) struct Drain<S> {
    source: S,
    decoder: ChunkDecoder,
    parser: StreamingParser,
    chunks: usize,
}

/// Updates produced by one chunk, or by the end of input.
pub(crate) struct Batch {
    pub(crate) updates: Vec<Update>,
    /// The finished document, once the source has ended.
    pub(crate) finished: Option<Snapshot>,
}

impl<S> Drain<S> {
    pub(crate) fn new(source: S, options: ParserOptions) -> Self {
        Self {
            source,
            decoder: ChunkDecoder::new(),
            parser: StreamingParser::new(options),
            chunks: 0,
        }
    }

    pub(crate) fn is_started(&self) -> bool {
        self.chunks > 0
    }
}

impl<S: ChunkSource> Drain<S> {
    /// Pulls chunks until one changes the document or the source ends.
    ///
    /// On a parse error, the updates of the failing chunk are never handed
    /// out.
    fn poll_batch(&mut self, cx: &mut Context<'_>) -> Poll<Result<Batch, StreamError>> {
        loop {
            let Some(chunk) = ready!(self.source.poll_chunk(cx)) else {
                let tail = self.decoder.finish();
                self.parser.feed(&tail)?;
                let snapshot = self.parser.finish()?;
                return Poll::Ready(Ok(Batch {
                    updates: self.parser.drain_updates(),
                    finished: Some(snapshot),
                }));
            };

            let text = self
                .decoder
                .normalize(chunk.map_err(StreamError::from_source)?);
            self.chunks += 1;
            trace!(chunk = self.chunks, len = text.len(), "feeding chunk");
            self.parser.feed(&text)?;

            let updates = self.parser.drain_updates();
            if !updates.is_empty() {
                return Poll::Ready(Ok(Batch {
                    updates,
                    finished: None,
                }));
            }
        }
    }
}

/// Exclusive right to drive the drain.
///
/// Dropping a driver that has neither completed nor failed puts the drain
/// back into the session, so another accessor can resume it.
pub(crate) struct Driver<S> {
    shared: Rc<Shared<S>>,
    drain: Option<Box<Drain<S>>>,
}

impl<S> Driver<S> {
    pub(crate) fn new(shared: Rc<Shared<S>>, drain: Box<Drain<S>>) -> Self {
        Self {
            shared,
            drain: Some(drain),
        }
    }

    /// Records one update in the session: its close, if any, and its snapshot
    /// as the latest one.
    pub(crate) fn observe(&self, update: &Update) {
        trace!(closed = ?update.closed, "update");
        if let Some(id) = update.closed {
            self.shared.tracker.borrow_mut().mark_closed(id);
        }
        self.shared.set_latest(update.snapshot.clone());
    }

    pub(crate) fn complete(mut self, snapshot: Snapshot) {
        let chunks = self.drain.take().map_or(0, |drain| drain.chunks);
        debug!(chunks, "drain completed");
        self.shared.set_latest(snapshot.clone());
        self.shared.release(DrainState::Completed(snapshot));
    }

    pub(crate) fn fail(mut self, err: StreamError) {
        self.drain = None;
        warn!(error = %err, "drain failed");
        self.shared.release(DrainState::Failed(err));
    }
}

impl<S: ChunkSource> Driver<S> {
    pub(crate) fn poll_batch(&mut self, cx: &mut Context<'_>) -> Poll<Result<Batch, StreamError>> {
        match self.drain.as_mut() {
            Some(drain) => drain.poll_batch(cx),
            None => Poll::Ready(Err(StreamError::DrainInProgress)),
        }
    }
}

impl<S> Drop for Driver<S> {
    fn drop(&mut self) {
        if let Some(drain) = self.drain.take() {
            debug!(chunks = drain.chunks, "drain handed back");
            self.shared.release(DrainState::Idle(drain));
        }
    }
}
