use riffle::{Latch, sync};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn test_awaiter_resumes_after_count_reaches_zero() {
    let latch = Arc::new(Latch::new(3));
    let resumed = Arc::new(AtomicUsize::new(0));

    let awaiter = {
        let latch = latch.clone();
        let resumed = resumed.clone();
        thread::spawn(move || {
            sync(async move {
                latch.wait().await;
                resumed.fetch_add(1, Ordering::SeqCst);
            })
        })
    };

    thread::sleep(Duration::from_millis(10));
    assert_eq!(resumed.load(Ordering::SeqCst), 0);

    let counters: Vec<_> = (0..3)
        .map(|_| {
            let latch = latch.clone();
            thread::spawn(move || latch.count_down())
        })
        .collect();

    for counter in counters {
        counter.join().unwrap();
    }

    awaiter.join().unwrap();
    assert_eq!(resumed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_zero_count_completes_immediately() {
    let latch = Latch::new(0);

    let value = sync(async move {
        latch.wait().await;
        9
    });

    assert_eq!(value, 9);
}

#[test]
fn test_count_down_before_await() {
    let latch = Arc::new(Latch::new(2));
    latch.count_down();
    latch.count_down();

    let awaited = latch.clone();
    let value = sync(async move {
        awaited.wait().await;
        5
    });

    assert_eq!(value, 5);
}

#[test]
fn test_extra_count_down_has_no_effect() {
    let latch = Arc::new(Latch::new(1));
    let resumed = Arc::new(AtomicUsize::new(0));

    let awaiter = {
        let latch = latch.clone();
        let resumed = resumed.clone();
        thread::spawn(move || {
            sync(async move {
                latch.wait().await;
                resumed.fetch_add(1, Ordering::SeqCst);
            })
        })
    };

    thread::sleep(Duration::from_millis(10));
    latch.count_down();
    latch.count_down();
    latch.count_down();

    awaiter.join().unwrap();
    assert_eq!(resumed.load(Ordering::SeqCst), 1);
}
