//! Executors: the threads that resume ready coroutines.
//!
//! A handle is a [`Waker`], the runtime's type-erased coroutine handle.
//! "Resuming" a handle means waking it on a worker thread, which re-polls
//! the owning driver there. Coroutine bodies therefore run on executor
//! workers (or on whichever thread triggered an event), never on the
//! reactor's I/O thread.

mod multi_thread;
mod single_thread;

pub use multi_thread::MultiThreadExecutor;
pub use single_thread::SingleThreadExecutor;

use crate::task::waker::{WakeTarget, make_waker};

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::thread::{self, ThreadId};

/// A hand-off of one parked coroutine to another thread.
///
/// The receiving thread records itself before waking the parked handle, and
/// the transferring future completes only when polled on that thread. A wake
/// that races the suspension (the driver absorbs it and re-polls on the
/// transferring thread) is reported as [`Handoff::Missed`] so the future can
/// hand itself off again instead of continuing on the wrong thread.
pub(crate) struct Transfer {
    state: Mutex<TransferState>,
}

enum TransferState {
    /// Waiting for the receiving thread; holds the parked handle.
    Parked(Waker),

    /// The hand-off landed on this thread.
    Fired(ThreadId),
}

/// Outcome of polling a transfer.
pub(crate) enum Handoff {
    /// The hand-off landed and this is the receiving thread.
    Done,

    /// Still waiting for the receiving thread.
    Waiting,

    /// The hand-off landed on another thread and was absorbed; transfer
    /// again.
    Missed,
}

impl Transfer {
    pub(crate) fn new(handle: Waker) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(TransferState::Parked(handle)),
        })
    }

    /// The waker to hand to the receiving thread.
    pub(crate) fn handle(transfer: &Arc<Self>) -> Waker {
        make_waker(transfer.clone())
    }

    /// Checks the hand-off from the polling thread, re-parking `handle` if
    /// it has not landed yet.
    pub(crate) fn check(&self, handle: &Waker) -> Handoff {
        let mut state = self.state.lock().unwrap();
        match &*state {
            TransferState::Fired(receiver) if *receiver == thread::current().id() => Handoff::Done,
            TransferState::Fired(_) => Handoff::Missed,
            TransferState::Parked(_) => {
                *state = TransferState::Parked(handle.clone());
                Handoff::Waiting
            }
        }
    }
}

impl WakeTarget for Transfer {
    fn on_wake(self: Arc<Self>) {
        let handle = {
            let mut state = self.state.lock().unwrap();
            match mem::replace(&mut *state, TransferState::Fired(thread::current().id())) {
                TransferState::Parked(handle) => Some(handle),
                TransferState::Fired(receiver) => {
                    *state = TransferState::Fired(receiver);
                    None
                }
            }
        };

        if let Some(handle) = handle {
            handle.wake();
        }
    }
}

/// The contract an executor offers the reactor and the combinators.
///
/// Implementations own their worker threads; [`resume`](Self::resume) hands
/// a parked handle over for resumption on one of them, and
/// [`shutdown`](Self::shutdown) drains outstanding handles and joins the
/// workers. Implementations are interchangeable wherever an executor is
/// expected.
pub trait Executor: Send + Sync + 'static {
    /// Enqueues a parked handle for resumption on a worker thread.
    fn resume(&self, handle: Waker);

    /// Signals the workers to drain and stop, then joins them. Idempotent.
    fn shutdown(&self);

    /// Whether shutdown has been requested.
    fn is_shutdown(&self) -> bool;
}

/// Entry point for shared executors: `executor.start().await` parks the
/// calling coroutine and resumes it on one of the executor's workers.
pub trait ExecutorHandle {
    /// Returns an awaitable that transfers the caller onto a worker thread.
    ///
    /// # Panics
    ///
    /// Panics if the executor has already been shut down.
    fn start(&self) -> Start;
}

impl<E: Executor> ExecutorHandle for Arc<E> {
    fn start(&self) -> Start {
        assert!(
            !self.is_shutdown(),
            "cannot start a coroutine on a shut-down executor"
        );

        Start {
            executor: self.clone(),
            transfer: None,
        }
    }
}

/// Future returned by [`ExecutorHandle::start`].
///
/// The first poll hands the calling coroutine's handle to the executor and
/// parks; the future completes once a worker has picked the handle up, so
/// the continuation runs on that worker.
pub struct Start {
    executor: Arc<dyn Executor>,
    transfer: Option<Arc<Transfer>>,
}

impl Future for Start {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            match &self.transfer {
                Some(transfer) => match transfer.check(cx.waker()) {
                    Handoff::Done => return Poll::Ready(()),
                    Handoff::Waiting => return Poll::Pending,
                    Handoff::Missed => self.transfer = None,
                },
                None => {
                    let transfer = Transfer::new(cx.waker().clone());
                    let handle = Transfer::handle(&transfer);
                    self.transfer = Some(transfer);
                    self.executor.resume(handle);
                    return Poll::Pending;
                }
            }
        }
    }
}
