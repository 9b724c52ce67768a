use crate::task::waker::{WakeTarget, make_waker};

use std::cell::UnsafeCell;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::thread;

/// The core is parked and may be woken.
const IDLE: usize = 0;
/// A thread is currently polling the future.
const RUNNING: usize = 1;
/// A wake-up arrived while polling; the runner must poll again.
const NOTIFIED: usize = 2;
/// The future finished and the result slot is written.
const COMPLETED: usize = 3;

/// A resumable driver around a future.
///
/// `Core` is what turns an arbitrary future into something the runtime can
/// hand around as a coroutine handle: an `Arc`-backed state machine with a
/// result slot and a list of completion waiters. Leaf futures receive the
/// core's own waker through the poll context; waking it re-polls the future
/// *on the waking thread*, so resumption runs wherever the wake-up came from
/// (an executor worker for reactor events, the triggering thread for events
/// and latches).
///
/// The blocking bridge drives its root through a `Core`, and the fan-out
/// combinator drives each child through one.
pub(crate) struct Core<T> {
    /// The driven future.
    ///
    /// Wrapped in `UnsafeCell` for interior mutability during `poll`; the
    /// `RUNNING` state guarantees a single poller at a time.
    future: UnsafeCell<Pin<Box<dyn Future<Output = T> + Send>>>,

    /// Lifecycle state (IDLE, RUNNING, NOTIFIED, COMPLETED).
    state: AtomicUsize,

    /// The produced value, or the captured panic payload.
    result: UnsafeCell<Option<thread::Result<T>>>,

    /// Wakers to notify when the future completes.
    waiters: Mutex<Vec<Waker>>,
}

// Safety: the future and result slots are only touched by the thread that
// owns the RUNNING state, or after the COMPLETED store has been observed.
unsafe impl<T: Send> Send for Core<T> {}
unsafe impl<T: Send> Sync for Core<T> {}

impl<T: Send + 'static> Core<T> {
    pub(crate) fn new<F>(future: F) -> Arc<Self>
    where
        F: Future<Output = T> + Send + 'static,
    {
        Arc::new(Self {
            future: UnsafeCell::new(Box::pin(future)),
            state: AtomicUsize::new(IDLE),
            result: UnsafeCell::new(None),
            waiters: Mutex::new(Vec::new()),
        })
    }

    /// Registers a waker to be notified once the future completes.
    ///
    /// Uses the double-check pattern: the state is re-read after the push so
    /// a completion racing the registration cannot strand the waker.
    pub(crate) fn add_waiter(&self, waker: Waker) {
        if self.state.load(Ordering::Acquire) == COMPLETED {
            waker.wake();
            return;
        }

        self.waiters.lock().unwrap().push(waker);

        if self.state.load(Ordering::Acquire) == COMPLETED {
            let waiters = mem::take(&mut *self.waiters.lock().unwrap());
            for waker in waiters {
                waker.wake();
            }
        }
    }

    /// Polls the future until it parks or completes.
    ///
    /// At most one thread runs the future at a time; a concurrent wake-up
    /// during the poll moves the state to `NOTIFIED` and the runner loops.
    pub(crate) fn run(self: Arc<Self>) {
        loop {
            match self
                .state
                .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(RUNNING) => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                Err(NOTIFIED) | Err(COMPLETED) => return,
                Err(_) => {}
            }
        }

        let waker = make_waker(self.clone());
        let mut cx = Context::from_waker(&waker);

        loop {
            // Safety: the RUNNING state guarantees exclusive access.
            let poll = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
                (*self.future.get()).as_mut().poll(&mut cx)
            }));

            match poll {
                Ok(Poll::Pending) => {
                    if self
                        .state
                        .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }

                    // A wake-up landed while polling; take the slot back and
                    // poll again.
                    self.state.store(RUNNING, Ordering::Release);
                }
                Ok(Poll::Ready(value)) => {
                    self.finish(Ok(value));
                    return;
                }
                Err(payload) => {
                    self.finish(Err(payload));
                    return;
                }
            }
        }
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETED
    }

    /// Takes the produced value, re-raising a captured panic.
    ///
    /// # Panics
    ///
    /// Panics if the future has not completed, if the result was already
    /// consumed, or (by re-raise) if the future itself panicked.
    pub(crate) fn take_result(&self) -> T {
        assert!(
            self.is_completed(),
            "task result accessed before completion"
        );

        // Safety: COMPLETED means no poll is in flight and the slot is set.
        let outcome = unsafe { (*self.result.get()).take() };

        match outcome.expect("task result already consumed") {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn finish(&self, outcome: thread::Result<T>) {
        // Safety: still RUNNING here, so the slot is exclusively ours.
        unsafe {
            *self.result.get() = Some(outcome);
        }
        self.state.store(COMPLETED, Ordering::Release);

        let waiters = mem::take(&mut *self.waiters.lock().unwrap());
        for waker in waiters {
            waker.wake();
        }
    }
}

impl<T: Send + 'static> WakeTarget for Core<T> {
    fn on_wake(self: Arc<Self>) {
        self.run();
    }
}
