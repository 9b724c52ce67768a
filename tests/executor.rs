use riffle::{Executor, ExecutorHandle, MultiThreadExecutor, SingleThreadExecutor, all, sync};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[test]
fn test_start_transfers_onto_worker_thread() {
    let executor = Arc::new(MultiThreadExecutor::new(2));
    let ex = executor.clone();

    let (before, after) = sync(async move {
        let before = thread::current().id();
        ex.start().await;
        (before, thread::current().id())
    });

    assert_ne!(before, after);
    executor.shutdown();
}

#[test]
fn test_single_thread_executor_resumes() {
    let executor = Arc::new(SingleThreadExecutor::new());
    let ex = executor.clone();

    let value = sync(async move {
        ex.start().await;
        7
    });

    assert_eq!(value, 7);
    executor.shutdown();
}

#[test]
fn test_single_thread_executor_runs_off_caller() {
    let executor = Arc::new(SingleThreadExecutor::new());
    let ex = executor.clone();
    let caller = thread::current().id();

    let worker = sync(async move {
        ex.start().await;
        thread::current().id()
    });

    assert_ne!(caller, worker);
    executor.shutdown();
}

#[test]
fn test_many_coroutines_share_the_pool() {
    let executor = Arc::new(MultiThreadExecutor::new(4));
    let counter = Arc::new(AtomicUsize::new(0));

    let children: Vec<_> = (0..32)
        .map(|_| {
            let ex = executor.clone();
            let counter = counter.clone();
            async move {
                ex.start().await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .collect();

    let finished = sync(all(children));
    assert_eq!(finished.len(), 32);
    assert_eq!(counter.load(Ordering::SeqCst), 32);

    executor.shutdown();
}

#[test]
fn test_shutdown_is_idempotent() {
    let executor = Arc::new(MultiThreadExecutor::new(2));
    executor.shutdown();
    executor.shutdown();
    assert!(executor.is_shutdown());
}

#[test]
#[should_panic(expected = "cannot start a coroutine on a shut-down executor")]
fn test_start_after_shutdown_panics() {
    let executor = Arc::new(MultiThreadExecutor::new(1));
    executor.shutdown();
    let _ = executor.start();
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn test_zero_workers_panics() {
    let _ = MultiThreadExecutor::new(0);
}
