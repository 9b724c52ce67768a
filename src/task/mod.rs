//! The lazy, one-shot unit of asynchronous work.
//!
//! A [`Task`] owns exactly one suspended computation. It does nothing until
//! driven: awaiting it runs the body inline on the awaiting thread (control
//! transfers directly, without growing the stack per suspension), while
//! [`Task::resume`] single-steps it for test harnesses.

pub(crate) mod core;
pub(crate) mod waker;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

/// A lazy, one-shot unit of asynchronous work with a typed result.
///
/// The wrapped body is created suspended and runs only when the task is
/// awaited or manually resumed. The result is produced exactly once; a panic
/// inside the body propagates to whoever drives the task.
///
/// ```rust,ignore
/// let task = Task::new(async { 42 });
/// assert_eq!(riffle::sync(task), 42);
/// ```
pub struct Task<T> {
    /// The suspended body. `None` once consumed or destroyed.
    future: Option<Pin<Box<dyn Future<Output = T> + Send>>>,

    /// Value parked by a manual [`resume`](Self::resume) that ran the body
    /// to completion, handed out on the next await.
    result: Option<T>,
}

impl<T> Task<T> {
    /// Wraps a future into a task. The body does not start running.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            future: Some(Box::pin(future)),
            result: None,
        }
    }

    /// Drives the body one step without a real waker.
    ///
    /// Returns `true` while the body has not completed. Intended for test
    /// harnesses: a body that parks on the reactor will not be woken again
    /// through this path.
    pub fn resume(&mut self) -> bool {
        if self.result.is_some() {
            return false;
        }

        let Some(future) = self.future.as_mut() else {
            return false;
        };

        let mut cx = Context::from_waker(Waker::noop());
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(value) => {
                self.result = Some(value);
                self.future = None;
                false
            }
            Poll::Pending => true,
        }
    }

    /// Drops the frame. Returns `true` if a frame was present.
    ///
    /// Awaiting the task afterwards panics.
    pub fn destroy(&mut self) -> bool {
        self.result = None;
        self.future.take().is_some()
    }

    /// Whether the body has run to completion (or the frame is gone).
    pub fn is_done(&self) -> bool {
        self.future.is_none()
    }
}

impl<T> Future for Task<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // SAFETY: `Task` is never itself pinned self-referentially — the only
        // pinned data is the already-boxed `future`, which is independent of
        // `Task`'s own address. Projecting a plain `&mut Self` out is sound.
        let this = unsafe { self.get_unchecked_mut() };

        if let Some(value) = this.result.take() {
            this.future = None;
            return Poll::Ready(value);
        }

        let future = this
            .future
            .as_mut()
            .expect("task polled after completion or destroy");

        match future.as_mut().poll(cx) {
            Poll::Ready(value) => {
                this.future = None;
                Poll::Ready(value)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
