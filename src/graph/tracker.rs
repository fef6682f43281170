//! The access tracker: a thread-scoped stack of capture frames.
//!
//! While a computed cell evaluates, every tracked read of a cell (or of a
//! sequence element or snapshot) reports a [`DependencyRef`] here. Reports go
//! to the innermost frame only, so a computed cell recomputing during another
//! cell's recomputation attributes its reads to itself and not to the outer
//! computation. Reads outside any frame are no-ops for dependency purposes.

use super::source::{AnySource, DependencyRef, SubscribedIndex};
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use std::{cell::RefCell, mem};

pub(crate) type DependencySet = IndexSet<DependencyRef, FxBuildHasher>;

thread_local! {
    static CAPTURE: RefCell<Vec<DependencySet>> = const { RefCell::new(Vec::new()) };
}

struct FrameGuard;

impl Drop for FrameGuard {
    fn drop(&mut self) {
        CAPTURE.with(|c| c.borrow_mut().pop());
    }
}

/// Pushes a capture frame, runs `f`, and returns its result together with
/// every dependency reported to that frame. The frame is popped even if `f`
/// panics, so a failed evaluation cannot leak into later captures.
pub(crate) fn capture_reads<T>(f: impl FnOnce() -> T) -> (T, DependencySet) {
    CAPTURE.with(|c| c.borrow_mut().push(DependencySet::default()));
    let guard = FrameGuard;
    let value = f();
    mem::forget(guard);
    let accessed = CAPTURE.with(|c| c.borrow_mut().pop()).unwrap_or_default();
    (value, accessed)
}

/// Whether any capture frame is active on this thread.
pub(crate) fn is_capturing() -> bool {
    CAPTURE.with(|c| !c.borrow().is_empty())
}

/// Records a whole-cell read against the innermost frame.
pub(crate) fn report_cell_read(source: AnySource) {
    report(DependencyRef {
        source,
        index: SubscribedIndex::Cell,
    });
}

/// Records a sequence read (one index, or the all-changes sentinel for a
/// whole-snapshot read) against the innermost frame.
pub(crate) fn report_index_read(source: AnySource, index: SubscribedIndex) {
    report(DependencyRef { source, index });
}

fn report(dependency: DependencyRef) {
    CAPTURE.with(|c| {
        if let Some(frame) = c.borrow_mut().last_mut() {
            frame.insert(dependency);
        }
    });
}

/// Runs `f` with all capture frames masked: no read inside `f` creates a
/// dependency, no matter how deeply nested the current computation is.
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    struct RestoreGuard(Vec<DependencySet>);
    impl Drop for RestoreGuard {
        fn drop(&mut self) {
            CAPTURE.with(|c| *c.borrow_mut() = mem::take(&mut self.0));
        }
    }

    let saved = CAPTURE.with(|c| mem::take(&mut *c.borrow_mut()));
    let _restore = RestoreGuard(saved);
    f()
}
