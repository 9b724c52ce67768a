//! Lazy sequences produced by a yielding coroutine.
//!
//! A [`Generator`] is a single-pass iterator over values its body yields.
//! The body runs only while the consumer advances: each
//! [`next`](Iterator::next) resumes it to the following yield point.
//!
//! ```rust,ignore
//! let mut numbers = riffle::generator(|y| async move {
//!     for n in 0.. {
//!         y.yield_value(n).await;
//!     }
//! });
//! assert_eq!(numbers.next(), Some(0));
//! assert_eq!(numbers.next(), Some(1));
//! ```

use std::cell::RefCell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// Hands values out of a generator body.
///
/// `yield_value(v).await` suspends the body until the consumer asks for the
/// next item. Awaiting anything else inside a generator body is forbidden by
/// design: the body has no runtime to park on.
pub struct Yielder<T> {
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> Yielder<T> {
    /// Yields one value to the consumer and suspends until the next resume.
    pub fn yield_value(&self, value: T) -> YieldValue<'_, T> {
        YieldValue {
            yielder: self,
            value: Some(value),
        }
    }
}

/// Future returned by [`Yielder::yield_value`].
pub struct YieldValue<'a, T> {
    yielder: &'a Yielder<T>,
    value: Option<T>,
}

impl<T> Future for YieldValue<'_, T> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        // SAFETY: `YieldValue` holds no self-referential pinned data; its
        // fields are a borrow and a plain value, so projecting a `&mut Self`
        // out of the pin is sound.
        let this = unsafe { self.get_unchecked_mut() };
        match this.value.take() {
            Some(value) => {
                *this.yielder.slot.borrow_mut() = Some(value);
                Poll::Pending
            }
            None => Poll::Ready(()),
        }
    }
}

/// Creates a lazy generator from a yielding body.
pub fn generator<T, F, Fut>(body: F) -> Generator<T>
where
    T: 'static,
    F: FnOnce(Yielder<T>) -> Fut,
    Fut: Future<Output = ()> + 'static,
{
    let slot = Rc::new(RefCell::new(None));
    let yielder = Yielder { slot: slot.clone() };

    Generator {
        future: Some(Box::pin(body(yielder))),
        slot,
    }
}

/// A lazy, single-pass sequence of yielded values.
///
/// Iteration resumes the body; a panic inside the body tears the frame down
/// and re-raises from `next`, after which iteration is over.
pub struct Generator<T> {
    future: Option<Pin<Box<dyn Future<Output = ()>>>>,
    slot: Rc<RefCell<Option<T>>>,
}

impl<T> Iterator for Generator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let future = self.future.as_mut()?;

        let mut cx = Context::from_waker(Waker::noop());
        let poll = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));

        match poll {
            Ok(Poll::Ready(())) => {
                self.future = None;
                None
            }
            Ok(Poll::Pending) => match self.slot.borrow_mut().take() {
                Some(value) => Some(value),
                None => panic!("generator suspended without yielding"),
            },
            Err(payload) => {
                self.future = None;
                panic::resume_unwind(payload);
            }
        }
    }
}
