use core::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use std::rc::Rc;

use super::{Acquire, ChunkSource, Shared, driver::Driver};
use crate::{StreamError, Value};

/// Future of the finished document, created by
/// [`JsonStream::document`](super::JsonStream::document).
///
/// While another accessor is draining the source, the future waits for that
/// drain to complete, fail, or be handed back. Otherwise it drives the source
/// itself, doing no matching work along the way.
#[must_use = "futures do nothing unless polled"]
pub struct Document<S> {
    shared: Rc<Shared<S>>,
    driver: Option<Driver<S>>,
}

impl<S> Document<S> {
    pub(crate) fn new(shared: Rc<Shared<S>>) -> Self {
        Self {
            shared,
            driver: None,
        }
    }
}

impl<S> fmt::Debug for Document<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("driving", &self.driver.is_some())
            .finish()
    }
}

impl<S: ChunkSource> Future for Document<S> {
    type Output = Result<Value, StreamError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            if let Some(mut driver) = this.driver.take() {
                match driver.poll_batch(cx) {
                    Poll::Pending => {
                        this.driver = Some(driver);
                        return Poll::Pending;
                    }
                    Poll::Ready(Err(err)) => {
                        driver.fail(err.clone());
                        return Poll::Ready(Err(err));
                    }
                    Poll::Ready(Ok(batch)) => {
                        for update in &batch.updates {
                            driver.observe(update);
                        }
                        match batch.finished {
                            Some(snapshot) => {
                                let document = snapshot.to_value();
                                driver.complete(snapshot);
                                return Poll::Ready(Ok(document));
                            }
                            None => this.driver = Some(driver),
                        }
                    }
                }
                continue;
            }

            match Shared::acquire(&this.shared) {
                Acquire::Driver(driver) => this.driver = Some(driver),
                Acquire::Busy => {
                    this.shared.register(cx.waker());
                    return Poll::Pending;
                }
                Acquire::Completed(snapshot) => return Poll::Ready(Ok(snapshot.to_value())),
                Acquire::Failed(err) => return Poll::Ready(Err(err)),
            }
        }
    }
}
