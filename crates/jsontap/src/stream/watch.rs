use core::{
    fmt, mem,
    pin::Pin,
    task::{Context, Poll},
};
use std::{
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use futures::Stream;
use tracing::trace;

use super::{Acquire, ChunkSource, Shared, driver::Driver};
use crate::{
    CompletionTracker, Snapshot, StreamError, Value,
    completion::Completeness,
    pointer::{PathItem, Pointer},
    tree::Update,
};

/// Matches of one pointer, de-duplicated by resolved path.
struct Selector {
    pointer: Pointer,
    mode: Completeness,
    /// Last value yielded at each resolved path.
    emitted: HashMap<Vec<PathItem>, Value>,
}

impl Selector {
    fn scan(
        &mut self,
        snapshot: &Snapshot,
        mode: Completeness,
        tracker: &CompletionTracker,
        out: &mut VecDeque<Value>,
    ) {
        for found in self.pointer.find_in(snapshot.root()) {
            if !mode.accepts(found.node, tracker) {
                continue;
            }
            let Some(value) = found.node.to_value() else {
                continue;
            };
            if self.emitted.get(&found.path) == Some(&value) {
                continue;
            }
            trace!(path = %Pointer::from_path(&found.path), "match");
            self.emitted.insert(found.path, value.clone());
            out.push_back(value);
        }
    }
}

enum View {
    Matches(Selector),
    Snapshots { last: Option<Value> },
}

impl View {
    fn on_update(&mut self, update: &Update, tracker: &CompletionTracker, out: &mut VecDeque<Value>) {
        if let View::Matches(selector) = self {
            let mode = selector.mode;
            selector.scan(&update.snapshot, mode, tracker, out);
        }
    }

    fn on_batch(&mut self, snapshot: Option<&Snapshot>, out: &mut VecDeque<Value>) {
        if let (View::Snapshots { last }, Some(snapshot)) = (self, snapshot) {
            let value = snapshot.to_value();
            if last.as_ref() != Some(&value) {
                out.push_back(value.clone());
                *last = Some(value);
            }
        }
    }

    /// Catches up with a document another accessor already started.
    fn resume(&mut self, snapshot: Option<&Snapshot>, tracker: &CompletionTracker, out: &mut VecDeque<Value>) {
        match self {
            View::Matches(selector) => {
                if let Some(snapshot) = snapshot {
                    let mode = selector.mode;
                    selector.scan(snapshot, mode, tracker, out);
                }
            }
            View::Snapshots { .. } => self.on_batch(snapshot, out),
        }
    }

    /// Reports a finished document, in which every container is closed.
    fn replay(&mut self, snapshot: &Snapshot, out: &mut VecDeque<Value>) {
        match self {
            View::Matches(selector) => {
                selector.scan(snapshot, Completeness::Value, &CompletionTracker::new(), out);
            }
            View::Snapshots { .. } => self.on_batch(Some(snapshot), out),
        }
    }
}

enum Phase<S> {
    Start,
    Driving(Driver<S>),
    Done,
}

/// Stream of values observed while the document is parsed.
///
/// Created by [`JsonStream::watch`](super::JsonStream::watch),
/// [`JsonStream::watch_complete`](super::JsonStream::watch_complete) and
/// [`JsonStream::snapshots`](super::JsonStream::snapshots). The first poll takes
/// over the drain; if another accessor is driving it, the stream yields
/// [`StreamError::DrainInProgress`] and ends. Once the source is finished,
/// a new watch replays the matches of the final document.
///
/// The next chunk is only pulled once every value queued so far has been
/// consumed. Dropping the stream hands the source back to the session.
#[must_use = "streams do nothing unless polled"]
pub struct Watch<S> {
    shared: Rc<Shared<S>>,
    view: View,
    phase: Phase<S>,
    pending: VecDeque<Value>,
}

impl<S> Watch<S> {
    pub(crate) fn matches(shared: Rc<Shared<S>>, pointer: Pointer, mode: Completeness) -> Self {
        Self::new(
            shared,
            View::Matches(Selector {
                pointer,
                mode,
                emitted: HashMap::new(),
            }),
        )
    }

    pub(crate) fn snapshots(shared: Rc<Shared<S>>) -> Self {
        Self::new(shared, View::Snapshots { last: None })
    }

    fn new(shared: Rc<Shared<S>>, view: View) -> Self {
        Self {
            shared,
            view,
            phase: Phase::Start,
            pending: VecDeque::new(),
        }
    }
}

impl<S> fmt::Debug for Watch<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Watch");
        match &self.view {
            View::Matches(selector) => s
                .field("pointer", &selector.pointer.to_string())
                .field("mode", &selector.mode),
            View::Snapshots { .. } => s.field("snapshots", &true),
        };
        s.field("pending", &self.pending.len()).finish_non_exhaustive()
    }
}

impl<S: ChunkSource> Stream for Watch<S> {
    type Item = Result<Value, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(value) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(value)));
            }

            match mem::replace(&mut this.phase, Phase::Done) {
                Phase::Done => return Poll::Ready(None),
                Phase::Start => match Shared::acquire(&this.shared) {
                    Acquire::Driver(driver) => {
                        let latest = this.shared.latest();
                        this.view.resume(
                            latest.as_ref(),
                            &this.shared.tracker.borrow(),
                            &mut this.pending,
                        );
                        this.phase = Phase::Driving(driver);
                    }
                    Acquire::Busy => return Poll::Ready(Some(Err(StreamError::DrainInProgress))),
                    Acquire::Completed(snapshot) => this.view.replay(&snapshot, &mut this.pending),
                    Acquire::Failed(err) => return Poll::Ready(Some(Err(err))),
                },
                Phase::Driving(mut driver) => match driver.poll_batch(cx) {
                    Poll::Pending => {
                        this.phase = Phase::Driving(driver);
                        return Poll::Pending;
                    }
                    Poll::Ready(Err(err)) => {
                        driver.fail(err.clone());
                        return Poll::Ready(Some(Err(err)));
                    }
                    Poll::Ready(Ok(batch)) => {
                        for update in &batch.updates {
                            driver.observe(update);
                            this.view.on_update(
                                update,
                                &this.shared.tracker.borrow(),
                                &mut this.pending,
                            );
                        }
                        this.view
                            .on_batch(batch.updates.last().map(|u| &u.snapshot), &mut this.pending);
                        match batch.finished {
                            Some(snapshot) => driver.complete(snapshot),
                            None => this.phase = Phase::Driving(driver),
                        }
                    }
                },
            }
        }
    }
}
