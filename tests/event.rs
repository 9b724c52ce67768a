use riffle::{Event, Task, sync};

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[test]
fn test_trigger_resumes_every_waiter() {
    let event = Arc::new(Event::new());
    let tags = Arc::new(Mutex::new(HashSet::new()));
    let waiting = Arc::new(AtomicUsize::new(0));

    let waiters: Vec<_> = ["A", "B", "C"]
        .into_iter()
        .map(|tag| {
            let event = event.clone();
            let tags = tags.clone();
            let waiting = waiting.clone();

            thread::spawn(move || {
                sync(async move {
                    waiting.fetch_add(1, Ordering::SeqCst);
                    event.wait().await;
                    tags.lock().unwrap().insert(tag);
                })
            })
        })
        .collect();

    while waiting.load(Ordering::SeqCst) < 3 {
        thread::yield_now();
    }
    thread::sleep(Duration::from_millis(20));

    event.trigger();

    for waiter in waiters {
        waiter.join().unwrap();
    }

    let recorded = tags.lock().unwrap();
    assert_eq!(*recorded, HashSet::from(["A", "B", "C"]));
}

#[test]
fn test_await_after_trigger_does_not_park() {
    let event = Event::new();
    event.trigger();

    let value = sync(async move {
        event.wait().await;
        7
    });

    assert_eq!(value, 7);
}

#[test]
fn test_trigger_inside_coroutine() {
    let event = Arc::new(Event::new());
    let awaited = event.clone();

    let value = sync(async move {
        awaited.trigger();
        awaited.wait().await;
        1
    });

    assert_eq!(value, 1);
}

#[test]
fn test_reset_clears_triggered_state() {
    let event = Arc::new(Event::new());

    event.trigger();
    assert!(event.is_triggered());

    event.reset();
    assert!(!event.is_triggered());

    // A fresh waiter parks again after the reset.
    let parked = event.clone();
    let mut task = Task::new(async move {
        parked.wait().await;
    });
    assert!(task.resume());

    event.trigger();
    assert!(event.is_triggered());
}

#[test]
fn test_repeated_trigger_is_idempotent() {
    let event = Arc::new(Event::new());
    let resumed = Arc::new(AtomicUsize::new(0));

    let waiter = {
        let event = event.clone();
        let resumed = resumed.clone();
        thread::spawn(move || {
            sync(async move {
                event.wait().await;
                resumed.fetch_add(1, Ordering::SeqCst);
            })
        })
    };

    thread::sleep(Duration::from_millis(10));
    event.trigger();
    event.trigger();

    waiter.join().unwrap();
    assert_eq!(resumed.load(Ordering::SeqCst), 1);
}
