//! Platform-specific readiness multiplexer backends.
//!
//! The reactor drives one [`Poller`]: epoll on Linux, kqueue on macOS and
//! the BSDs. Both backends expose the same surface: persistent registration
//! for the wake descriptors, one-shot registration for watched descriptors,
//! a blocking wait that translates kernel flags into [`PollStatus`], and
//! idempotent deletion.

use crate::reactor::poll::PollStatus;

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(not(target_os = "linux"))]
mod kqueue;

#[cfg(target_os = "linux")]
pub(crate) use epoll::Poller;

#[cfg(not(target_os = "linux"))]
pub(crate) use kqueue::Poller;

/// How many kernel events a single wait services.
pub(crate) const EVENT_BATCH: usize = 16;

/// A readiness notification, already translated for the reactor.
pub(crate) struct ReadyEvent {
    /// Token supplied at registration (a record token or a wake token).
    pub(crate) token: usize,

    /// Kernel flags folded into a poll status.
    pub(crate) status: PollStatus,
}
