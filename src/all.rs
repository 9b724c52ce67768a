//! Concurrent fan-out over a set of awaitables.
//!
//! [`all`] accepts a heterogeneous tuple or a homogeneous `Vec` of futures
//! and completes once every one of them has completed. Awaiting it yields
//! per-child [`AllTask`] wrappers; each child captures its own outcome
//! independently, and a failing child never cancels its siblings.

use crate::task::core::Core;
use crate::task::waker::{WakeTarget, make_waker};

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

/// Completion counter shared between the parent and its children.
///
/// Initialized to N+1: one decrement per child plus one for the parent
/// installing itself. The parent subtracts after starting the children and
/// parks only if others are still outstanding; the final transition to zero
/// resumes it.
pub struct AllLatch {
    count: AtomicUsize,
    waker: Mutex<Option<Waker>>,
}

impl AllLatch {
    fn new(children: usize) -> Self {
        Self {
            count: AtomicUsize::new(children + 1),
            waker: Mutex::new(None),
        }
    }

    /// Installs the parent and takes its share of the count.
    ///
    /// Returns `true` if children are still outstanding and the parent must
    /// park.
    fn try_wait(&self, waker: Waker) -> bool {
        *self.waker.lock().unwrap() = Some(waker);
        self.count.fetch_sub(1, Ordering::AcqRel) > 1
    }

    /// Called once per completed child; the last completion resumes the
    /// parent.
    fn notify_completed(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            let waker = self.waker.lock().unwrap().take();
            if let Some(waker) = waker {
                waker.wake();
            }
        }
    }

    fn set_waker(&self, waker: Waker) {
        *self.waker.lock().unwrap() = Some(waker);
    }

    fn is_done(&self) -> bool {
        self.count.load(Ordering::Acquire) == 0
    }
}

/// Bridges a child's completion to the latch.
struct LatchNotifier {
    latch: Arc<AllLatch>,
}

impl WakeTarget for LatchNotifier {
    fn on_wake(self: Arc<Self>) {
        self.latch.notify_completed();
    }
}

/// One child of a fan-out, holding its result after completion.
pub struct AllTask<T> {
    core: Arc<Core<T>>,
}

impl<T: Send + 'static> AllTask<T> {
    fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            core: Core::new(future),
        }
    }

    /// Hooks the child up to the latch and runs it until its first
    /// suspension, on the calling thread.
    fn start(&self, latch: &Arc<AllLatch>) {
        self.core.add_waiter(make_waker(Arc::new(LatchNotifier {
            latch: latch.clone(),
        })));
        self.core.clone().run();
    }

    /// Takes the child's value, re-raising its panic if it failed.
    ///
    /// # Panics
    ///
    /// Panics if the child has not completed, or (by re-raise) if the child
    /// itself panicked.
    pub fn result(self) -> T {
        self.core.take_result()
    }

    pub fn is_done(&self) -> bool {
        self.core.is_completed()
    }
}

/// A set of futures that can be fanned out together.
pub trait AllSet {
    /// The per-child wrapper storage yielded on completion.
    type Storage: AllChildren;

    fn into_storage(self) -> (Self::Storage, usize);
}

/// Storage whose children can be started against a latch.
pub trait AllChildren {
    fn start_all(&self, latch: &Arc<AllLatch>);
}

/// Awaits a set of awaitables concurrently; completes when all complete.
///
/// Children are started in order on the awaiting thread and run to
/// completion wherever their wake-ups take them. The output preserves
/// positional correspondence with the input.
///
/// ```rust,ignore
/// let (a, b) = riffle::sync(riffle::all((async { 1 }, async { 2 })));
/// assert_eq!(a.result() + b.result(), 3);
/// ```
pub fn all<A: AllSet>(awaitables: A) -> AllAwaitable<A::Storage> {
    let (storage, children) = awaitables.into_storage();

    AllAwaitable {
        storage: Some(storage),
        latch: Arc::new(AllLatch::new(children)),
        started: false,
    }
}

/// Future returned by [`all`].
pub struct AllAwaitable<S: AllChildren> {
    storage: Option<S>,
    latch: Arc<AllLatch>,
    started: bool,
}

impl<S: AllChildren + Unpin> Future for AllAwaitable<S> {
    type Output = S;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        if !this.started {
            this.started = true;

            this.storage
                .as_ref()
                .expect("fan-out polled after completion")
                .start_all(&this.latch);

            if this.latch.try_wait(cx.waker().clone()) {
                return Poll::Pending;
            }

            return Poll::Ready(this.storage.take().unwrap());
        }

        if this.latch.is_done() {
            return Poll::Ready(
                this.storage
                    .take()
                    .expect("fan-out polled after completion"),
            );
        }

        this.latch.set_waker(cx.waker().clone());
        if this.latch.is_done() {
            return Poll::Ready(
                this.storage
                    .take()
                    .expect("fan-out polled after completion"),
            );
        }

        Poll::Pending
    }
}

impl AllSet for () {
    type Storage = ();

    fn into_storage(self) -> (Self::Storage, usize) {
        ((), 0)
    }
}

impl AllChildren for () {
    fn start_all(&self, _latch: &Arc<AllLatch>) {}
}

impl<F> AllSet for Vec<F>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    type Storage = Vec<AllTask<F::Output>>;

    fn into_storage(self) -> (Self::Storage, usize) {
        let children = self.len();
        let storage = self.into_iter().map(AllTask::new).collect();
        (storage, children)
    }
}

impl<T: Send + 'static> AllChildren for Vec<AllTask<T>> {
    fn start_all(&self, latch: &Arc<AllLatch>) {
        for child in self {
            child.start(latch);
        }
    }
}

macro_rules! all_tuple {
    ($len:literal; $($future:ident $output:ident $idx:tt),+) => {
        impl<$($future),+> AllSet for ($($future,)+)
        where
            $($future: Future + Send + 'static, $future::Output: Send + 'static,)+
        {
            type Storage = ($(AllTask<$future::Output>,)+);

            fn into_storage(self) -> (Self::Storage, usize) {
                (($(AllTask::new(self.$idx),)+), $len)
            }
        }

        impl<$($output),+> AllChildren for ($(AllTask<$output>,)+)
        where
            $($output: Send + 'static,)+
        {
            fn start_all(&self, latch: &Arc<AllLatch>) {
                $(self.$idx.start(latch);)+
            }
        }
    };
}

all_tuple!(1; F0 T0 0);
all_tuple!(2; F0 T0 0, F1 T1 1);
all_tuple!(3; F0 T0 0, F1 T1 1, F2 T2 2);
all_tuple!(4; F0 T0 0, F1 T1 1, F2 T2 2, F3 T3 3);
all_tuple!(5; F0 T0 0, F1 T1 1, F2 T2 2, F3 T3 3, F4 T4 4);
all_tuple!(6; F0 T0 0, F1 T1 1, F2 T2 2, F3 T3 3, F4 T4 4, F5 T5 5);
all_tuple!(7; F0 T0 0, F1 T1 1, F2 T2 2, F3 T3 3, F4 T4 4, F5 T5 5, F6 T6 6);
all_tuple!(8; F0 T0 0, F1 T1 1, F2 T2 2, F3 T3 3, F4 T4 4, F5 T5 5, F6 T6 6, F7 T7 7);
