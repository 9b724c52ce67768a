use riffle::{Task, all, sync};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_results_sum_across_children() {
    let (a, b, c) = sync(all((
        Task::new(async { 1 }),
        Task::new(async { 2 }),
        Task::new(async { 3 }),
    )));

    assert_eq!(a.result() + b.result() + c.result(), 6);
}

#[test]
fn test_tuple_preserves_positional_correspondence() {
    let (text, number, flag) = sync(all((
        async { String::from("first") },
        async { 2usize },
        async { true },
    )));

    assert_eq!(text.result(), "first");
    assert_eq!(number.result(), 2);
    assert!(flag.result());
}

#[test]
fn test_empty_fan_out_completes_immediately() {
    sync(all(()));
}

#[test]
fn test_homogeneous_range() {
    let children: Vec<_> = (1..=10).map(|n| async move { n }).collect();

    let finished = sync(all(children));
    let total: i32 = finished.into_iter().map(|child| child.result()).sum();

    assert_eq!(total, 55);
}

#[test]
fn test_every_child_runs() {
    let counter = Arc::new(AtomicUsize::new(0));

    let children: Vec<_> = (0..16)
        .map(|_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
        .collect();

    sync(all(children));
    assert_eq!(counter.load(Ordering::SeqCst), 16);
}

#[test]
fn test_failing_child_does_not_cancel_siblings() {
    let completed = Arc::new(AtomicUsize::new(0));
    let sibling = completed.clone();

    let (failed, survived) = sync(all((
        async {
            panic!("child failed");
        },
        async move {
            sibling.fetch_add(1, Ordering::SeqCst);
            5
        },
    )));

    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert!(survived.is_done());
    assert_eq!(survived.result(), 5);

    let failure = panic::catch_unwind(AssertUnwindSafe(|| failed.result()));
    let payload = failure.unwrap_err();
    let message = payload.downcast_ref::<&str>().copied().unwrap_or_default();
    assert_eq!(message, "child failed");
}

#[test]
fn test_nested_fan_out() {
    let (inner_sum, single) = sync(all((
        async {
            let (a, b) = all((async { 10 }, async { 20 })).await;
            a.result() + b.result()
        },
        async { 3 },
    )));

    assert_eq!(inner_sum.result(), 30);
    assert_eq!(single.result(), 3);
}
