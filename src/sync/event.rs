use std::future::Future;
use std::pin::Pin;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::task::{Context, Poll, Waker};

/// A parked waiter, linked into the event's intrusive stack.
struct Waiter {
    waker: Waker,
    next: *mut Waiter,
}

/// Sentinel head marking the event as triggered.
///
/// Published by `trigger` in the same exchange that detaches the waiter
/// list, so a waiter whose CAS loses the race observes the sentinel and
/// completes without parking instead of linking onto a dead list.
fn triggered() -> *mut Waiter {
    ptr::without_provenance_mut(1)
}

/// A manual-reset notification shared between coroutines and threads.
///
/// Waiters park on a lock-free Treiber stack; [`trigger`](Self::trigger)
/// detaches the whole stack in one exchange and resumes every parked waiter
/// exactly once, in LIFO order (no FIFO guarantee is made). Once triggered,
/// new waiters complete immediately without parking, until
/// [`reset`](Self::reset).
///
/// `reset` is only valid between trigger cycles; calling it while waiters
/// are still parked discards them without resuming.
pub struct Event {
    triggered: AtomicBool,
    waiters: AtomicPtr<Waiter>,
}

impl Event {
    pub fn new() -> Self {
        Self {
            triggered: AtomicBool::new(false),
            waiters: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Marks the event triggered and resumes every parked waiter.
    ///
    /// Safe to call from any thread; waiters resume on the triggering
    /// thread. A second trigger is a no-op until the event is reset.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);

        let mut node = self.waiters.swap(triggered(), Ordering::AcqRel);
        if node == triggered() {
            return;
        }

        while !node.is_null() {
            // Safety: nodes are detached from the shared stack, so this
            // thread is their sole owner.
            let waiter = unsafe { Box::from_raw(node) };
            node = waiter.next;
            waiter.waker.wake();
        }
    }

    /// Clears the triggered state so the event can be awaited again.
    ///
    /// Only valid between trigger cycles; any waiter still linked is
    /// discarded without being resumed.
    pub fn reset(&self) {
        self.triggered.store(false, Ordering::Release);

        let head = self.waiters.swap(ptr::null_mut(), Ordering::AcqRel);
        if head != triggered() {
            free_list(head);
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Returns a future that completes once the event is triggered.
    pub fn wait(&self) -> EventWait<'_> {
        EventWait {
            event: self,
            parked: false,
        }
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Event {
    fn drop(&mut self) {
        let head = *self.waiters.get_mut();
        if head != triggered() {
            free_list(head);
        }
    }
}

fn free_list(mut node: *mut Waiter) {
    while !node.is_null() {
        // Safety: the list was detached; nodes are exclusively ours.
        let waiter = unsafe { Box::from_raw(node) };
        node = waiter.next;
    }
}

/// Future returned by [`Event::wait`].
pub struct EventWait<'a> {
    event: &'a Event,
    parked: bool,
}

impl Future for EventWait<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.event.is_triggered() {
            return Poll::Ready(());
        }

        if self.parked {
            return Poll::Pending;
        }

        let node = Box::into_raw(Box::new(Waiter {
            waker: cx.waker().clone(),
            next: ptr::null_mut(),
        }));

        let mut head = self.event.waiters.load(Ordering::Acquire);
        loop {
            if head == triggered() {
                // Lost the race with a trigger; no parking.
                drop(unsafe { Box::from_raw(node) });
                return Poll::Ready(());
            }

            // Safety: the node is not yet shared.
            unsafe {
                (*node).next = head;
            }

            match self.event.waiters.compare_exchange_weak(
                head,
                node,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.parked = true;
                    return Poll::Pending;
                }
                Err(current) => head = current,
            }
        }
    }
}
