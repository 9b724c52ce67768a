use super::Executor;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::task::Waker;
use std::thread::{self, JoinHandle};

/// An executor sharing a deque of pending handles across worker threads.
///
/// Workers pop handles and resume them with the queue lock released, so a
/// body is free to enqueue further work. An outstanding-work counter lets
/// shutdown drain everything already handed over before the workers exit.
/// No ordering is guaranteed among handles enqueued from different threads.
pub struct MultiThreadExecutor {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

struct Shared {
    handles: Mutex<VecDeque<Waker>>,
    available: Condvar,

    /// Handles enqueued or currently being resumed.
    outstanding: AtomicUsize,

    shutdown_requested: AtomicBool,
}

impl MultiThreadExecutor {
    /// Creates the executor with `threads` worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `threads` is zero.
    pub fn new(threads: usize) -> Self {
        assert!(threads > 0, "worker_threads must be > 0");

        let shared = Arc::new(Shared {
            handles: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            outstanding: AtomicUsize::new(0),
            shutdown_requested: AtomicBool::new(false),
        });

        let mut workers = Vec::with_capacity(threads);
        for id in 0..threads {
            let shared = shared.clone();
            let worker = thread::Builder::new()
                .name(format!("riffle-worker-{id}"))
                .spawn(move || shared.run())
                .expect("failed to spawn executor worker");
            workers.push(worker);
        }

        Self {
            shared,
            workers: Mutex::new(workers),
        }
    }
}

impl Executor for MultiThreadExecutor {
    fn resume(&self, handle: Waker) {
        self.shared.outstanding.fetch_add(1, Ordering::Release);
        {
            self.shared.handles.lock().unwrap().push_back(handle);
        }
        self.shared.available.notify_one();
    }

    fn shutdown(&self) {
        if self.shared.shutdown_requested.swap(true, Ordering::AcqRel) {
            return;
        }

        {
            let _handles = self.shared.handles.lock().unwrap();
            self.shared.available.notify_all();
        }

        for worker in self.workers.lock().unwrap().drain(..) {
            let _ = worker.join();
        }

        tracing::debug!("multi-thread executor shut down");
    }

    fn is_shutdown(&self) -> bool {
        self.shared.shutdown_requested.load(Ordering::Acquire)
    }
}

impl Shared {
    fn run(&self) {
        tracing::trace!("executor worker started");

        loop {
            let handle = {
                let mut handles = self.handles.lock().unwrap();
                loop {
                    if let Some(handle) = handles.pop_front() {
                        break handle;
                    }
                    if self.shutdown_requested.load(Ordering::Acquire)
                        && self.outstanding.load(Ordering::Acquire) == 0
                    {
                        return;
                    }
                    handles = self.available.wait(handles).unwrap();
                }
            };

            // Resume with the lock released: the body may enqueue more
            // handles onto this executor without deadlocking.
            handle.wake();

            if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1
                && self.shutdown_requested.load(Ordering::Acquire)
            {
                // Last outstanding handle under shutdown: let the other
                // workers re-evaluate their exit condition.
                let _handles = self.handles.lock().unwrap();
                self.available.notify_all();
            }
        }
    }
}

impl Drop for MultiThreadExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
