//! Linux `epoll` backend.

use super::{EVENT_BATCH, ReadyEvent};
use crate::reactor::poll::{PollStatus, PollType};

use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLLERR, EPOLLHUP, EPOLLIN, EPOLLONESHOT,
    EPOLLOUT, EPOLLRDHUP, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};

pub(crate) struct Poller {
    epoll: AtomicI32,
}

impl Poller {
    pub(crate) fn new() -> io::Result<Self> {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            epoll: AtomicI32::new(epoll),
        })
    }

    fn fd(&self) -> RawFd {
        self.epoll.load(Ordering::Acquire)
    }

    /// Registers a wake descriptor for persistent read readiness.
    pub(crate) fn add_wake(&self, fd: RawFd, token: usize) -> io::Result<()> {
        let mut event = epoll_event {
            events: EPOLLIN as u32,
            u64: token as u64,
        };

        let rc = unsafe { epoll_ctl(self.fd(), EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Arms a one-shot watch on `fd`.
    ///
    /// The kernel disarms the registration after the first event, so each
    /// registration produces exactly one notification.
    pub(crate) fn add_oneshot(&self, fd: RawFd, poll_type: PollType, token: usize) -> io::Result<()> {
        let mut flags = (EPOLLONESHOT | EPOLLRDHUP) as u32;
        flags |= match poll_type {
            PollType::Read => EPOLLIN as u32,
            PollType::Write => EPOLLOUT as u32,
            PollType::ReadWrite => (EPOLLIN | EPOLLOUT) as u32,
        };

        let mut event = epoll_event {
            events: flags,
            u64: token as u64,
        };

        let rc = unsafe { epoll_ctl(self.fd(), EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Removes `fd` from the epoll set. Idempotent: a descriptor already
    /// disarmed or never registered is ignored.
    pub(crate) fn delete(&self, fd: RawFd) {
        unsafe {
            epoll_ctl(self.fd(), EPOLL_CTL_DEL, fd, std::ptr::null_mut());
        }
    }

    /// Blocks until readiness arrives, filling `events` with up to
    /// [`EVENT_BATCH`] translated notifications.
    pub(crate) fn wait(&self, events: &mut Vec<ReadyEvent>) -> io::Result<()> {
        let mut buffer: [epoll_event; EVENT_BATCH] = unsafe { std::mem::zeroed() };

        let n = unsafe { epoll_wait(self.fd(), buffer.as_mut_ptr(), EVENT_BATCH as i32, -1) };

        events.clear();

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }

        for event in &buffer[..n as usize] {
            events.push(ReadyEvent {
                token: event.u64 as usize,
                status: translate(event.events),
            });
        }

        Ok(())
    }

    pub(crate) fn close(&self) {
        let fd = self.epoll.swap(-1, Ordering::AcqRel);
        if fd >= 0 {
            unsafe {
                libc::close(fd);
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.close();
    }
}

/// Folds kernel flags into a poll status.
///
/// `EPOLLHUP` joins `EPOLLRDHUP` in mapping to `Closed`: a pipe whose writer
/// went away reports hang-up, which is the same peer-gone condition kqueue
/// reports as `EV_EOF`.
fn translate(events: u32) -> PollStatus {
    if events & (EPOLLRDHUP | EPOLLHUP) as u32 != 0 {
        PollStatus::Closed
    } else if events & EPOLLERR as u32 != 0 {
        PollStatus::Error
    } else if events & (EPOLLIN | EPOLLOUT) as u32 != 0 {
        PollStatus::Ready
    } else {
        PollStatus::Error
    }
}
