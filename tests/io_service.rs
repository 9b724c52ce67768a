use riffle::{
    Executor, IoService, MultiThreadExecutor, PollStatus, PollType, SingleThreadExecutor, all, sync,
};

use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

fn pipe() -> (RawFd, RawFd) {
    let mut fds = [0; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0, "pipe failed");
    (fds[0], fds[1])
}

fn socket_pair() -> (RawFd, RawFd) {
    let mut fds = [0; 2];
    let rc = unsafe { libc::socketpair(libc::AF_UNIX, libc::SOCK_STREAM, 0, fds.as_mut_ptr()) };
    assert_eq!(rc, 0, "socketpair failed");
    (fds[0], fds[1])
}

fn write_byte(fd: RawFd) {
    assert_eq!(unsafe { libc::write(fd, b"x".as_ptr() as *const _, 1) }, 1);
}

fn close_fd(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

fn service() -> (Arc<MultiThreadExecutor>, IoService<MultiThreadExecutor>) {
    let executor = Arc::new(MultiThreadExecutor::new(2));
    let io = IoService::new(executor.clone()).expect("failed to start io service");
    (executor, io)
}

fn wait_for_drain(io: &IoService<MultiThreadExecutor>) {
    let deadline = Instant::now() + Duration::from_secs(1);
    while io.size() > 0 {
        assert!(Instant::now() < deadline, "registrations did not drain");
        thread::yield_now();
    }
}

#[test]
fn test_schedule_resumes_on_a_worker_thread() {
    let (_executor, io) = service();

    let transfer = io.schedule();
    let (before, after) = sync(async move {
        let before = thread::current().id();
        transfer.await;
        (before, thread::current().id())
    });

    assert_ne!(before, after);

    wait_for_drain(&io);
    io.close();
}

#[test]
fn test_poll_reports_ready_on_readable_pipe() {
    let (_executor, io) = service();
    let (r, w) = pipe();

    write_byte(w);

    let readable = io.poll(r, PollType::Read);
    let status = sync(async move { readable.await });
    assert_eq!(status, PollStatus::Ready);

    io.close();
    close_fd(r);
    close_fd(w);
}

#[test]
fn test_poll_reports_closed_after_peer_close() {
    let (_executor, io) = service();
    let (r, w) = pipe();

    close_fd(w);

    let readable = io.poll(r, PollType::Read);
    let status = sync(async move { readable.await });
    assert_eq!(status, PollStatus::Closed);

    io.close();
    close_fd(r);
}

#[test]
fn test_poll_reports_write_readiness() {
    let (_executor, io) = service();
    let (r, w) = pipe();

    let writable = io.poll(w, PollType::Write);
    let status = sync(async move { writable.await });
    assert_eq!(status, PollStatus::Ready);

    io.close();
    close_fd(r);
    close_fd(w);
}

#[test]
fn test_poll_read_write_readiness_on_socket_pair() {
    let (_executor, io) = service();
    let (a, b) = socket_pair();

    // Pending data plus free send buffer: both interests are ready at once,
    // so the backends that register read and write separately deliver two
    // notifications for the same registration in one batch.
    write_byte(b);

    let both = io.poll(a, PollType::ReadWrite);
    let status = sync(async move { both.await });
    assert_eq!(status, PollStatus::Ready);

    wait_for_drain(&io);

    // The registration unwound fully; the descriptor can be watched again.
    let again = io.poll(a, PollType::ReadWrite);
    let status = sync(async move { again.await });
    assert_eq!(status, PollStatus::Ready);

    io.close();
    close_fd(a);
    close_fd(b);
}

#[test]
fn test_poll_read_write_with_only_write_ready() {
    let (_executor, io) = service();
    let (a, b) = socket_pair();

    // No pending data: only the write side of the ReadWrite interest fires.
    let both = io.poll(a, PollType::ReadWrite);
    let status = sync(async move { both.await });
    assert_eq!(status, PollStatus::Ready);

    io.close();
    close_fd(a);
    close_fd(b);
}

#[test]
fn test_poll_resumes_when_data_arrives_later() {
    let (_executor, io) = service();
    let (r, w) = pipe();

    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        write_byte(w);
        w
    });

    let readable = io.poll(r, PollType::Read);
    let status = sync(async move { readable.await });
    assert_eq!(status, PollStatus::Ready);

    let w = writer.join().unwrap();
    io.close();
    close_fd(r);
    close_fd(w);
}

#[test]
fn test_schedule_wakes_coalesce() {
    let (_executor, io) = service();
    let counter = Arc::new(AtomicUsize::new(0));

    let children: Vec<_> = (0..8)
        .map(|_| {
            let transfer = io.schedule();
            let counter = counter.clone();
            async move {
                transfer.await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .collect();

    sync(all(children));
    assert_eq!(counter.load(Ordering::SeqCst), 8);

    wait_for_drain(&io);
    io.close();
}

#[test]
fn test_size_returns_to_zero_after_completion() {
    let (_executor, io) = service();
    let (r, w) = pipe();

    write_byte(w);

    let readable = io.poll(r, PollType::Read);
    sync(async move { readable.await });

    wait_for_drain(&io);
    assert_eq!(io.size(), 0);

    io.close();
    close_fd(r);
    close_fd(w);
}

#[test]
fn test_single_thread_executor_drives_the_reactor() {
    let executor = Arc::new(SingleThreadExecutor::new());
    let io = IoService::new(executor).expect("failed to start io service");
    let (r, w) = pipe();

    write_byte(w);

    let readable = io.poll(r, PollType::Read);
    let status = sync(async move { readable.await });
    assert_eq!(status, PollStatus::Ready);

    io.close();
    close_fd(r);
    close_fd(w);
}

#[test]
fn test_close_is_idempotent() {
    let (_executor, io) = service();

    io.close();
    io.close();
    assert_eq!(io.size(), 0);
}

#[test]
fn test_drop_closes_the_service() {
    let (executor, io) = service();

    let transfer = io.schedule();
    sync(async move { transfer.await });

    wait_for_drain(&io);
    drop(io);

    assert!(executor.is_shutdown());
}

#[test]
fn test_schedule_then_poll_round_trip() {
    let (_executor, io) = service();
    let (r, w) = pipe();

    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        write_byte(w);
        w
    });

    let transfer = io.schedule();
    let readable = io.poll(r, PollType::Read);
    let status = sync(async move {
        transfer.await;
        readable.await
    });

    assert_eq!(status, PollStatus::Ready);

    let w = writer.join().unwrap();
    io.close();
    close_fd(r);
    close_fd(w);
}
