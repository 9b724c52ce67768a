use crate::task::core::Core;
use crate::task::waker::{WakeTarget, make_waker};

use std::future::Future;
use std::sync::{Arc, Condvar, Mutex};

/// Condition-variable-backed completion signal for the blocking bridge.
pub(crate) struct SyncEvent {
    triggered: Mutex<bool>,
    cond: Condvar,
}

impl SyncEvent {
    pub(crate) fn new() -> Self {
        Self {
            triggered: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    pub(crate) fn trigger(&self) {
        *self.triggered.lock().unwrap() = true;
        self.cond.notify_all();
    }

    pub(crate) fn wait(&self) {
        let mut triggered = self.triggered.lock().unwrap();
        while !*triggered {
            triggered = self.cond.wait(triggered).unwrap();
        }
    }
}

impl WakeTarget for SyncEvent {
    fn on_wake(self: Arc<Self>) {
        self.trigger();
    }
}

/// Runs an awaitable from non-async code, blocking until it completes.
///
/// The body starts synchronously on the calling thread and runs until its
/// first real suspension; from then on it is driven by whichever threads
/// wake it (executor workers for reactor events, triggering threads for
/// events and latches). The calling thread blocks on a condition variable
/// until completion, then returns the result or re-raises the body's panic.
///
/// The awaitable must be advanced to completion by some thread reachable
/// from the runtime. Calling `sync` from inside an async context deadlocks
/// if the blocked thread is the only one able to advance the awaited work.
///
/// ```rust,ignore
/// assert_eq!(riffle::sync(async { 21 * 2 }), 42);
/// ```
pub fn sync<F>(awaitable: F) -> F::Output
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let completion = Arc::new(SyncEvent::new());
    let core = Core::new(awaitable);

    core.add_waiter(make_waker(completion.clone()));
    core.clone().run();

    completion.wait();
    core.take_result()
}
