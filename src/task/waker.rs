use std::mem;
use std::sync::Arc;
use std::task::{RawWaker, RawWakerVTable, Waker};

/// Anything an [`Waker`] can point at.
///
/// A `WakeTarget` is the receiving end of a wake-up: driver cores re-poll
/// their future, the blocking bridge releases its condition variable, and
/// fan-out children notify their latch. Waking always runs `on_wake` on the
/// waking thread.
pub(crate) trait WakeTarget: Send + Sync + 'static {
    fn on_wake(self: Arc<Self>);
}

/// Returns the `RawWakerVTable` for a wake target of type `W`.
///
/// # Safety
///
/// All functions in the vtable must uphold the invariants required by
/// [`RawWaker`], in particular:
/// - reference counts must be correctly managed,
/// - the target must remain valid for the lifetime of the waker.
fn vtable<W: WakeTarget>() -> &'static RawWakerVTable {
    &RawWakerVTable::new(
        clone_raw::<W>,
        wake_raw::<W>,
        wake_by_ref_raw::<W>,
        drop_raw::<W>,
    )
}

/// Creates a [`Waker`] from a shared wake target.
///
/// The pointer stored inside the `RawWaker` originates from
/// `Arc::into_raw` and follows proper reference counting semantics.
pub(crate) fn make_waker<W: WakeTarget>(target: Arc<W>) -> Waker {
    unsafe {
        Waker::from_raw(RawWaker::new(
            Arc::into_raw(target) as *const (),
            vtable::<W>(),
        ))
    }
}

/// Clones the raw waker by bumping the `Arc` reference count.
fn clone_raw<W: WakeTarget>(ptr: *const ()) -> RawWaker {
    let arc = unsafe { Arc::<W>::from_raw(ptr as *const W) };
    let cloned = arc.clone();
    mem::forget(arc);

    RawWaker::new(Arc::into_raw(cloned) as *const (), vtable::<W>())
}

/// Wakes the target and consumes the waker.
fn wake_raw<W: WakeTarget>(ptr: *const ()) {
    let arc = unsafe { Arc::<W>::from_raw(ptr as *const W) };
    arc.on_wake();
}

/// Wakes the target without consuming the waker.
fn wake_by_ref_raw<W: WakeTarget>(ptr: *const ()) {
    let arc = unsafe { Arc::<W>::from_raw(ptr as *const W) };
    arc.clone().on_wake();
    mem::forget(arc);
}

/// Drops the raw waker, releasing one `Arc` reference.
fn drop_raw<W: WakeTarget>(ptr: *const ()) {
    unsafe { Arc::<W>::from_raw(ptr as *const W) };
}
