use riffle::generator;

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

#[test]
fn test_yields_values_in_order() {
    let squares = generator(|y| async move {
        for n in 1..=4 {
            y.yield_value(n * n).await;
        }
    });

    assert_eq!(squares.collect::<Vec<_>>(), vec![1, 4, 9, 16]);
}

#[test]
fn test_generator_is_lazy() {
    let started = Rc::new(Cell::new(false));
    let flag = started.clone();

    let mut items = generator(move |y| async move {
        flag.set(true);
        y.yield_value(1).await;
    });

    assert!(!started.get());
    assert_eq!(items.next(), Some(1));
    assert!(started.get());
}

#[test]
fn test_infinite_generator() {
    let naturals = generator(|y| async move {
        let mut n = 0u64;
        loop {
            y.yield_value(n).await;
            n += 1;
        }
    });

    assert_eq!(naturals.take(5).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_empty_generator() {
    let mut empty = generator(|_y: riffle::Yielder<i32>| async move {});

    assert_eq!(empty.next(), None);
    assert_eq!(empty.next(), None);
}

#[test]
fn test_panic_rethrown_on_advance_then_iteration_ends() {
    let mut items = generator(|y| async move {
        y.yield_value(1).await;
        panic!("generator body failed");
    });

    assert_eq!(items.next(), Some(1));

    let failure = panic::catch_unwind(AssertUnwindSafe(|| items.next()));
    let payload = failure.unwrap_err();
    let message = payload.downcast_ref::<&str>().copied().unwrap_or_default();
    assert_eq!(message, "generator body failed");

    assert_eq!(items.next(), None);
}

#[test]
fn test_single_pass_consumption() {
    let mut letters = generator(|y| async move {
        y.yield_value('a').await;
        y.yield_value('b').await;
    });

    assert_eq!(letters.next(), Some('a'));
    assert_eq!(letters.next(), Some('b'));
    assert_eq!(letters.next(), None);
    assert_eq!(letters.next(), None);
}
