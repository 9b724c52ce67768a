use riffle::{Event, Task, sync};

use std::panic;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_sync_over_a_trivially_returning_task() {
    assert_eq!(sync(Task::new(async { 42 })), 42);
}

#[test]
fn test_sync_returns_owned_values() {
    let text = sync(async { format!("{}-{}", "riffle", 1) });
    assert_eq!(text, "riffle-1");
}

#[test]
fn test_sync_rethrows_body_panic() {
    let failure = panic::catch_unwind(|| {
        sync(async {
            panic!("bridge failure");
        })
    });

    let payload = failure.unwrap_err();
    let message = payload.downcast_ref::<&str>().copied().unwrap_or_default();
    assert_eq!(message, "bridge failure");
}

#[test]
fn test_sync_blocks_until_another_thread_advances() {
    let event = Arc::new(Event::new());

    let trigger = {
        let event = event.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            event.trigger();
        })
    };

    let value = sync(async move {
        event.wait().await;
        11
    });

    assert_eq!(value, 11);
    trigger.join().unwrap();
}

#[test]
fn test_sync_of_unit() {
    sync(async {});
}
