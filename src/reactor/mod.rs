//! The I/O reactor: kernel readiness in, resumptions out.
//!
//! An [`IoService`] owns a dedicated I/O thread blocked on the platform
//! multiplexer. Coroutines reach it two ways: [`schedule`](IoService::schedule)
//! parks the caller and re-runs it on a worker thread of the bound executor,
//! and [`poll`](IoService::poll) parks the caller until a file descriptor
//! becomes ready. The I/O thread never runs coroutine bodies; every ready
//! handle is handed to the executor.

pub(crate) mod poll;
pub(crate) mod poller;
pub(crate) mod wake;

pub use poll::{PollStatus, PollType};

use crate::error::Error;
use crate::executor::{Executor, Handoff, Transfer};
use crate::reactor::poll::PollRecord;
use crate::reactor::poller::Poller;
use crate::reactor::wake::WakeFd;
use crate::utils::Slab;

use std::future::Future;
use std::mem;
use std::os::fd::RawFd;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::thread::{self, JoinHandle};

/// Token of the scheduler wake descriptor.
const SCHEDULER_TOKEN: usize = usize::MAX;

/// Token of the shutdown wake descriptor.
const SHUTDOWN_TOKEN: usize = usize::MAX - 1;

/// Bridges kernel readiness notifications into coroutine resumption.
///
/// Generic over the [`Executor`] used for all resumption. Dropping the
/// service closes it; [`close`](Self::close) is idempotent and joins the
/// I/O thread after outstanding registrations drain.
pub struct IoService<E: Executor> {
    shared: Arc<Shared<E>>,
    io_thread: Mutex<Option<JoinHandle<()>>>,
}

struct Shared<E> {
    executor: Arc<E>,

    poller: Poller,

    /// Woken by `schedule` to make the I/O thread service the queue.
    scheduler_wake: WakeFd,

    /// Woken once by `close` to break the kernel wait; deliberately never
    /// drained, so the wait keeps returning while registrations drain.
    shutdown_wake: WakeFd,

    /// Deduplicates scheduler wake-ups: set by the first scheduler after a
    /// servicing pass, cleared under the queue lock when the queue is
    /// claimed.
    scheduler_wake_sent: AtomicBool,

    /// Handles parked by `schedule`, claimed wholesale by the I/O thread.
    scheduled: Mutex<Vec<Waker>>,

    /// In-flight poll registrations, keyed by the token the kernel echoes.
    registrations: Mutex<Slab<Arc<PollRecord>>>,

    /// Outstanding asynchronous registrations (scheduled + polled).
    awaiting: AtomicUsize,

    close_requested: AtomicBool,
}

impl<E: Executor> IoService<E> {
    /// Creates the service and starts its I/O thread.
    ///
    /// Multiplexer or wake-descriptor creation failures are fatal and
    /// surface here.
    pub fn new(executor: Arc<E>) -> Result<Self, Error> {
        let poller = Poller::new().map_err(Error::Multiplexer)?;
        let scheduler_wake = WakeFd::new().map_err(Error::WakeFd)?;
        let shutdown_wake = WakeFd::new().map_err(Error::WakeFd)?;

        poller
            .add_wake(scheduler_wake.read_fd(), SCHEDULER_TOKEN)
            .map_err(Error::WakeRegistration)?;
        poller
            .add_wake(shutdown_wake.read_fd(), SHUTDOWN_TOKEN)
            .map_err(Error::WakeRegistration)?;

        let shared = Arc::new(Shared {
            executor,
            poller,
            scheduler_wake,
            shutdown_wake,
            scheduler_wake_sent: AtomicBool::new(false),
            scheduled: Mutex::new(Vec::new()),
            registrations: Mutex::new(Slab::with_capacity(64)),
            awaiting: AtomicUsize::new(0),
            close_requested: AtomicBool::new(false),
        });

        let io_thread = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("riffle-io".into())
                .spawn(move || shared.run())
                .map_err(Error::ReactorThread)?
        };

        Ok(Self {
            shared,
            io_thread: Mutex::new(Some(io_thread)),
        })
    }

    /// Returns an awaitable that transfers the calling coroutine onto a
    /// worker thread of the bound executor.
    ///
    /// Wake-up writes coalesce: any number of pending schedules produce at
    /// most one pending wake byte until the I/O thread services the queue.
    pub fn schedule(&self) -> Schedule<E> {
        Schedule {
            shared: self.shared.clone(),
            transfer: None,
        }
    }

    /// Returns an awaitable that completes with the readiness status of
    /// `fd`.
    ///
    /// The registration is one-shot: each call produces exactly one
    /// notification. The descriptor is watched for the given readiness;
    /// error and peer-close conditions are always reported.
    pub fn poll(&self, fd: RawFd, poll_type: PollType) -> PollReadiness<E> {
        PollReadiness {
            shared: self.shared.clone(),
            fd,
            poll_type,
            record: None,
            token: 0,
            finished: false,
        }
    }

    /// The number of outstanding asynchronous registrations.
    pub fn size(&self) -> usize {
        self.shared.awaiting.load(Ordering::Acquire)
    }

    /// Shuts the service down: stops the executor, unblocks and joins the
    /// I/O thread, closes every descriptor. Idempotent.
    ///
    /// Must be called from outside the runtime's threads: closing from a
    /// worker of the bound executor would join the calling thread.
    pub fn close(&self) {
        if self.shared.close_requested.swap(true, Ordering::AcqRel) {
            return;
        }

        self.shared.executor.shutdown();
        self.shared.shutdown_wake.trigger();

        if let Some(io_thread) = self.io_thread.lock().unwrap().take() {
            let _ = io_thread.join();
        }

        self.shared.poller.close();
        self.shared.scheduler_wake.close();
        self.shared.shutdown_wake.close();
    }
}

impl<E: Executor> Drop for IoService<E> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<E: Executor> Shared<E> {
    /// The reactor loop, run by the dedicated I/O thread.
    fn run(&self) {
        tracing::debug!("reactor thread started");

        let mut events = Vec::with_capacity(poller::EVENT_BATCH);

        while !self.close_requested.load(Ordering::Acquire)
            || self.awaiting.load(Ordering::Acquire) > 0
        {
            if let Err(error) = self.poller.wait(&mut events) {
                tracing::error!(%error, "kernel readiness wait failed, reactor stopping");
                return;
            }

            for event in &events {
                match event.token {
                    SCHEDULER_TOKEN => self.drain_scheduled(),
                    SHUTDOWN_TOKEN => {}
                    token => self.complete_poll(token, event.status),
                }
            }
        }

        tracing::debug!("reactor thread stopped");
    }

    /// Claims the scheduled queue and hands every handle to the executor.
    ///
    /// The wake descriptor and the dedup flag are reset under the queue
    /// lock, so a schedule racing the claim either lands in the claimed
    /// batch or sends a fresh wake byte.
    fn drain_scheduled(&self) {
        let handles = {
            let mut scheduled = self.scheduled.lock().unwrap();
            self.scheduler_wake.reset();
            self.scheduler_wake_sent.store(false, Ordering::Release);
            mem::take(&mut *scheduled)
        };

        let count = handles.len();
        for handle in handles {
            self.executor.resume(handle);
        }

        if count > 0 {
            self.awaiting.fetch_sub(count, Ordering::Release);
        }
    }

    /// Delivers a readiness notification to the record behind `token`.
    fn complete_poll(&self, token: usize, status: PollStatus) {
        let record = self.registrations.lock().unwrap().try_remove(token);
        let Some(record) = record else {
            return;
        };

        if let Some(handle) = record.complete(status) {
            // One-shot registrations are already disarmed; the deletion is
            // idempotent housekeeping.
            self.poller.delete(record.fd());
            self.executor.resume(handle);
        }

        self.awaiting.fetch_sub(1, Ordering::Release);
    }
}

/// Future returned by [`IoService::schedule`].
///
/// Completes only once a worker has picked the handle up, so the
/// continuation runs on that worker even if the hand-off races the
/// suspension.
pub struct Schedule<E: Executor> {
    shared: Arc<Shared<E>>,
    transfer: Option<Arc<Transfer>>,
}

impl<E: Executor> Future for Schedule<E> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        loop {
            if let Some(transfer) = &self.transfer {
                match transfer.check(cx.waker()) {
                    Handoff::Done => return Poll::Ready(()),
                    Handoff::Waiting => return Poll::Pending,
                    Handoff::Missed => {
                        self.transfer = None;
                        continue;
                    }
                }
            }

            let transfer = Transfer::new(cx.waker().clone());
            let handle = Transfer::handle(&transfer);
            self.transfer = Some(transfer);

            self.shared.awaiting.fetch_add(1, Ordering::Release);
            {
                self.shared.scheduled.lock().unwrap().push(handle);
            }

            if self
                .shared
                .scheduler_wake_sent
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                self.shared.scheduler_wake.trigger();
            }

            return Poll::Pending;
        }
    }
}

/// Future returned by [`IoService::poll`].
pub struct PollReadiness<E: Executor> {
    shared: Arc<Shared<E>>,
    fd: RawFd,
    poll_type: PollType,

    /// The shared record, once registered.
    record: Option<Arc<PollRecord>>,
    token: usize,

    /// Set once the status has been observed; the registration is fully
    /// accounted for from then on.
    finished: bool,
}

impl<E: Executor> Future for PollReadiness<E> {
    type Output = PollStatus;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        if let Some(record) = &this.record {
            if let Some(status) = record.status() {
                this.finished = true;
                return Poll::Ready(status);
            }

            record.set_waker(cx.waker().clone());

            // The reactor may have delivered between the check and the
            // install; re-read so the resumption cannot be lost.
            if let Some(status) = record.status() {
                this.finished = true;
                return Poll::Ready(status);
            }

            return Poll::Pending;
        }

        // First poll: account, install the handle, then arm the descriptor.
        // The waker is stored before registration so a delivery can never
        // find an empty record.
        this.shared.awaiting.fetch_add(1, Ordering::Release);

        let record = Arc::new(PollRecord::new(this.fd));
        record.set_waker(cx.waker().clone());

        let token = this
            .shared
            .registrations
            .lock()
            .unwrap()
            .insert(record.clone());

        this.record = Some(record);
        this.token = token;

        if let Err(error) = this.shared.poller.add_oneshot(this.fd, this.poll_type, token) {
            tracing::debug!(fd = this.fd, %error, "one-shot registration failed");

            this.shared.registrations.lock().unwrap().try_remove(token);
            this.shared.awaiting.fetch_sub(1, Ordering::Release);
            this.finished = true;
            return Poll::Ready(PollStatus::Error);
        }

        Poll::Pending
    }
}

impl<E: Executor> Drop for PollReadiness<E> {
    fn drop(&mut self) {
        if self.record.is_none() || self.finished {
            return;
        }

        // Abandoned mid-flight. If the record is still registered this side
        // owns the cleanup; otherwise the reactor already delivered and
        // accounted for it.
        let removed = self
            .shared
            .registrations
            .lock()
            .unwrap()
            .try_remove(self.token);

        if removed.is_some() {
            self.shared.poller.delete(self.fd);
            self.shared.awaiting.fetch_sub(1, Ordering::Release);
        }
    }
}
