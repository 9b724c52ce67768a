use std::io;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};

/// A platform-abstracted wake-up descriptor.
///
/// A single readable/writable descriptor whose only job is to unblock the
/// reactor's kernel wait from another thread: an `eventfd` on Linux, a
/// non-blocking pipe pair elsewhere. [`trigger`](Self::trigger) is safe from
/// any thread; [`reset`](Self::reset) is only called by the reactor thread.
#[cfg(target_os = "linux")]
pub(crate) struct WakeFd {
    fd: AtomicI32,
}

#[cfg(target_os = "linux")]
impl WakeFd {
    pub(crate) fn new() -> io::Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            fd: AtomicI32::new(fd),
        })
    }

    /// The descriptor the poller watches for read readiness.
    pub(crate) fn read_fd(&self) -> RawFd {
        self.fd.load(Ordering::Acquire)
    }

    /// Makes the descriptor readable, unblocking a kernel wait on it.
    pub(crate) fn trigger(&self) {
        let increment: u64 = 1;
        unsafe {
            libc::write(
                self.read_fd(),
                &increment as *const u64 as *const _,
                size_of::<u64>(),
            );
        }
    }

    /// Drains the descriptor so it stops reporting readable.
    pub(crate) fn reset(&self) {
        let mut counter: u64 = 0;
        unsafe {
            libc::read(
                self.read_fd(),
                &mut counter as *mut u64 as *mut _,
                size_of::<u64>(),
            );
        }
    }

    /// Closes the descriptor. Idempotent.
    pub(crate) fn close(&self) {
        let fd = self.fd.swap(-1, Ordering::AcqRel);
        if fd >= 0 {
            unsafe {
                libc::close(fd);
            }
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) struct WakeFd {
    read_fd: AtomicI32,
    write_fd: AtomicI32,
}

#[cfg(not(target_os = "linux"))]
impl WakeFd {
    pub(crate) fn new() -> io::Result<Self> {
        let mut fds = [-1 as libc::c_int; 2];
        if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }

        for fd in fds {
            let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
            if flags < 0 || unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0
            {
                let err = io::Error::last_os_error();
                unsafe {
                    libc::close(fds[0]);
                    libc::close(fds[1]);
                }
                return Err(err);
            }
        }

        Ok(Self {
            read_fd: AtomicI32::new(fds[0]),
            write_fd: AtomicI32::new(fds[1]),
        })
    }

    pub(crate) fn read_fd(&self) -> RawFd {
        self.read_fd.load(Ordering::Acquire)
    }

    pub(crate) fn trigger(&self) {
        unsafe {
            libc::write(self.write_fd.load(Ordering::Acquire), b"a".as_ptr() as *const _, 1);
        }
    }

    pub(crate) fn reset(&self) {
        let mut buf = [0u8; 128];
        loop {
            let n = unsafe {
                libc::read(self.read_fd(), buf.as_mut_ptr() as *mut _, buf.len())
            };
            if n < buf.len() as isize {
                break;
            }
        }
    }

    pub(crate) fn close(&self) {
        for fd in [&self.read_fd, &self.write_fd] {
            let fd = fd.swap(-1, Ordering::AcqRel);
            if fd >= 0 {
                unsafe {
                    libc::close(fd);
                }
            }
        }
    }
}

impl Drop for WakeFd {
    fn drop(&mut self) {
        self.close();
    }
}
