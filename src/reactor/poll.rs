use std::os::fd::RawFd;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::task::Waker;

/// Readiness outcome delivered for a watched descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The descriptor is readable/writable as requested.
    Ready,
    /// Reserved: the reactor has no timers and never produces this.
    Timeout,
    /// The kernel reported an error condition on the descriptor.
    Error,
    /// The peer closed its end of the descriptor.
    Closed,
}

/// The readiness a [`poll`](crate::IoService::poll) call watches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollType {
    Read,
    Write,
    ReadWrite,
}

/// Status slot sentinel: no readiness delivered yet.
const STATUS_PENDING: u8 = u8::MAX;

fn encode(status: PollStatus) -> u8 {
    match status {
        PollStatus::Ready => 0,
        PollStatus::Timeout => 1,
        PollStatus::Error => 2,
        PollStatus::Closed => 3,
    }
}

fn decode(raw: u8) -> PollStatus {
    match raw {
        0 => PollStatus::Ready,
        1 => PollStatus::Timeout,
        2 => PollStatus::Error,
        _ => PollStatus::Closed,
    }
}

/// Reactor-side record of one in-flight readiness registration.
///
/// Created per `poll` call and shared between the awaiting future and the
/// reactor's registration table. The waker is installed before the
/// descriptor is armed, so a delivery can never observe a record without a
/// handle to resume.
pub(crate) struct PollRecord {
    fd: RawFd,

    /// Delivered status, `STATUS_PENDING` until the reactor writes it.
    status: AtomicU8,

    /// Set once, when the reactor delivers; a record is never completed
    /// twice.
    processed: AtomicBool,

    /// The parked handle, taken exactly once on delivery.
    waker: Mutex<Option<Waker>>,
}

impl PollRecord {
    pub(crate) fn new(fd: RawFd) -> Self {
        Self {
            fd,
            status: AtomicU8::new(STATUS_PENDING),
            processed: AtomicBool::new(false),
            waker: Mutex::new(None),
        }
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.fd
    }

    pub(crate) fn set_waker(&self, waker: Waker) {
        *self.waker.lock().unwrap() = Some(waker);
    }

    /// The delivered status, if any.
    pub(crate) fn status(&self) -> Option<PollStatus> {
        match self.status.load(Ordering::Acquire) {
            STATUS_PENDING => None,
            raw => Some(decode(raw)),
        }
    }

    /// Publishes the delivered status and takes the parked handle.
    ///
    /// Returns `None` if the record was already processed.
    pub(crate) fn complete(&self, status: PollStatus) -> Option<Waker> {
        if self.processed.swap(true, Ordering::AcqRel) {
            return None;
        }

        self.status.store(encode(status), Ordering::Release);
        self.waker.lock().unwrap().take()
    }
}
