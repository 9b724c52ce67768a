use super::Executor;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::task::Waker;
use std::thread::{self, JoinHandle};

/// An executor with a single worker thread and a single handle slot.
///
/// The slot holds at most one pending handle; a second
/// [`resume`](Executor::resume) before the worker picks the first up
/// overwrites it (last writer wins). Callers must serialize their resumes;
/// in practice the reactor does, handing over one handle at a time.
pub struct SingleThreadExecutor {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    /// The pending handle, if any.
    slot: Mutex<Option<Waker>>,
    available: Condvar,
    shutdown_requested: AtomicBool,
}

impl SingleThreadExecutor {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            slot: Mutex::new(None),
            available: Condvar::new(),
            shutdown_requested: AtomicBool::new(false),
        });

        let worker = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("riffle-worker".into())
                .spawn(move || shared.run())
                .expect("failed to spawn executor worker")
        };

        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }
}

impl Executor for SingleThreadExecutor {
    fn resume(&self, handle: Waker) {
        {
            *self.shared.slot.lock().unwrap() = Some(handle);
        }
        self.shared.available.notify_one();
    }

    fn shutdown(&self) {
        if self.shared.shutdown_requested.swap(true, Ordering::AcqRel) {
            return;
        }

        {
            let _slot = self.shared.slot.lock().unwrap();
            self.shared.available.notify_one();
        }

        if let Some(worker) = self.worker.lock().unwrap().take() {
            let _ = worker.join();
        }

        tracing::debug!("single-thread executor shut down");
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
                let mut slot = self.slot.lock().unwrap();
                loop {
                    if let Some(handle) = slot.take() {
                        break handle;
                    }
                    if self.shutdown_requested.load(Ordering::Acquire) {
                        return;
                    }
                    slot = self.available.wait(slot).unwrap();
                }
            };

            // Resume with the lock released: the body may resume other
            // handles onto this executor.
            handle.wake();
        }
    }
}

impl Default for SingleThreadExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SingleThreadExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
