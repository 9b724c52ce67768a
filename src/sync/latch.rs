use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll, Waker};

/// A counting synchronization primitive awaited by a single coroutine.
///
/// Constructed with an initial count; [`count_down`](Self::count_down)
/// decrements it, and the transition to zero resumes the awaiter exactly
/// once. Awaiting a latch whose count is already zero completes immediately.
/// Extra `count_down` calls are permitted and have no further effect on the
/// awaiter. Only one coroutine may await a latch.
pub struct Latch {
    count: AtomicUsize,
    waiter: Mutex<Option<Waker>>,
}

impl Latch {
    pub fn new(count: usize) -> Self {
        Self {
            count: AtomicUsize::new(count),
            waiter: Mutex::new(None),
        }
    }

    /// Decrements the count, resuming the awaiter on the 1 → 0 transition.
    ///
    /// The waker slot is taken before waking, so the awaiter resumes at most
    /// once. Resumption runs on the calling thread.
    pub fn count_down(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            let waker = self.waiter.lock().unwrap().take();
            if let Some(waker) = waker {
                waker.wake();
            }
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Returns a future that completes once the count reaches zero.
    pub fn wait(&self) -> LatchWait<'_> {
        LatchWait { latch: self }
    }
}

/// Future returned by [`Latch::wait`].
pub struct LatchWait<'a> {
    latch: &'a Latch,
}

impl Future for LatchWait<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.latch.count() == 0 {
            return Poll::Ready(());
        }

        *self.latch.waiter.lock().unwrap() = Some(cx.waker().clone());

        // The count may have hit zero between the check and the install;
        // re-read so the wake cannot be lost.
        if self.latch.count() == 0 {
            self.latch.waiter.lock().unwrap().take();
            return Poll::Ready(());
        }

        Poll::Pending
    }
}
