//! macOS / BSD `kqueue` backend.

use super::{EVENT_BATCH, ReadyEvent};
use crate::reactor::poll::{PollStatus, PollType};

use libc::{
    EV_ADD, EV_DELETE, EV_ENABLE, EV_EOF, EV_ERROR, EV_ONESHOT, EVFILT_READ, EVFILT_WRITE, kevent,
    kqueue,
};
use std::io;
use std::os::fd::RawFd;
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};

pub(crate) struct Poller {
    kqueue: AtomicI32,
}

impl Poller {
    pub(crate) fn new() -> io::Result<Self> {
        let kq = unsafe { kqueue() };
        if kq < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            kqueue: AtomicI32::new(kq),
        })
    }

    fn fd(&self) -> RawFd {
        self.kqueue.load(Ordering::Acquire)
    }

    fn submit(&self, changes: &[kevent]) -> io::Result<()> {
        let rc = unsafe {
            kevent(
                self.fd(),
                changes.as_ptr(),
                changes.len() as i32,
                ptr::null_mut(),
                0,
                ptr::null(),
            )
        };

        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Registers a wake descriptor for persistent read readiness.
    pub(crate) fn add_wake(&self, fd: RawFd, token: usize) -> io::Result<()> {
        self.submit(&[kevent {
            ident: fd as usize,
            filter: EVFILT_READ,
            flags: EV_ADD | EV_ENABLE,
            fflags: 0,
            data: 0,
            udata: token as *mut _,
        }])
    }

    /// Arms a one-shot watch on `fd`.
    pub(crate) fn add_oneshot(&self, fd: RawFd, poll_type: PollType, token: usize) -> io::Result<()> {
        let mut changes = Vec::with_capacity(2);

        if matches!(poll_type, PollType::Read | PollType::ReadWrite) {
            changes.push(kevent {
                ident: fd as usize,
                filter: EVFILT_READ,
                flags: EV_ADD | EV_ENABLE | EV_ONESHOT,
                fflags: 0,
                data: 0,
                udata: token as *mut _,
            });
        }

        if matches!(poll_type, PollType::Write | PollType::ReadWrite) {
            changes.push(kevent {
                ident: fd as usize,
                filter: EVFILT_WRITE,
                flags: EV_ADD | EV_ENABLE | EV_ONESHOT,
                fflags: 0,
                data: 0,
                udata: token as *mut _,
            });
        }

        self.submit(&changes)
    }

    /// Removes both filters for `fd`. Idempotent: missing filters are
    /// ignored.
    pub(crate) fn delete(&self, fd: RawFd) {
        for filter in [EVFILT_READ, EVFILT_WRITE] {
            let _ = self.submit(&[kevent {
                ident: fd as usize,
                filter,
                flags: EV_DELETE,
                fflags: 0,
                data: 0,
                udata: ptr::null_mut(),
            }]);
        }
    }

    /// Blocks until readiness arrives, filling `events` with up to
    /// [`EVENT_BATCH`] translated notifications.
    pub(crate) fn wait(&self, events: &mut Vec<ReadyEvent>) -> io::Result<()> {
        let mut buffer: [kevent; EVENT_BATCH] = unsafe { std::mem::zeroed() };

        let n = unsafe {
            kevent(
                self.fd(),
                ptr::null(),
                0,
                buffer.as_mut_ptr(),
                EVENT_BATCH as i32,
                ptr::null(),
            )
        };

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
                token: event.udata as usize,
                status: translate(event.flags),
            });
        }

        Ok(())
    }

    pub(crate) fn close(&self) {
        let fd = self.kqueue.swap(-1, Ordering::AcqRel);
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

fn translate(flags: u16) -> PollStatus {
    if flags & EV_EOF != 0 {
        PollStatus::Closed
    } else if flags & EV_ERROR != 0 {
        PollStatus::Error
    } else {
        PollStatus::Ready
    }
}
