//! Synchronization primitives and the blocking bridge.
//!
//! [`Event`] is a manual-reset broadcast with a lock-free waiter list,
//! [`Latch`] a counting primitive awaited by a single coroutine, and
//! [`sync`] the bridge that runs an awaitable to completion from
//! non-async code.

mod bridge;
mod event;
mod latch;

pub use bridge::sync;
pub use event::{Event, EventWait};
pub use latch::{Latch, LatchWait};
