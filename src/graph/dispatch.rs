//! Thread-scoped dispatch bookkeeping.
//!
//! Three pieces of state live here, all keyed to the current call stack
//! rather than stored inside cells:
//!
//! - the reentrancy registry: which (cell, channel) pairs are currently
//!   mid-notification, so a channel is never dispatched re-entrantly and so
//!   the cycle-suppression rule can interrogate an opaque subscriber token by
//!   id without dereferencing it;
//! - the pass stack: one "already notified" token set per active notify
//!   pass, recording transitively-notified subscribers so two cells mirroring
//!   each other's writes settle after one round;
//! - the propagation queue: recomputations triggered from inside an active
//!   dispatch are deferred to the outermost frame, so a chain of computed
//!   cells propagates iteratively instead of growing the stack with its
//!   length.

use crate::{channel::Channel, subscription::SubscriberId};
use rustc_hash::FxHashSet;
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
};

thread_local! {
    static NOTIFYING: RefCell<FxHashSet<(usize, Channel)>> =
        RefCell::new(FxHashSet::default());
    static PASSES: RefCell<Vec<FxHashSet<usize>>> = const { RefCell::new(Vec::new()) };
    static QUEUE: RefCell<VecDeque<Box<dyn FnOnce()>>> =
        const { RefCell::new(VecDeque::new()) };
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Marks `owner` mid-notification on `channel` for the duration of the
/// returned guard. Returns `None` when the pair is already active, which the
/// caller treats as "skip this pass entirely".
pub(crate) fn enter(owner: SubscriberId, channel: Channel) -> Option<NotifyGuard> {
    let inserted = NOTIFYING.with(|n| n.borrow_mut().insert((owner.0, channel)));
    inserted.then_some(NotifyGuard {
        key: (owner.0, channel),
    })
}

pub(crate) struct NotifyGuard {
    key: (usize, Channel),
}

impl Drop for NotifyGuard {
    fn drop(&mut self) {
        NOTIFYING.with(|n| {
            n.borrow_mut().remove(&self.key);
        });
    }
}

/// Whether the cell identified by `token` is mid-notification on `channel`
/// somewhere up the current call stack.
pub(crate) fn is_notifying(token: SubscriberId, channel: Channel) -> bool {
    NOTIFYING.with(|n| n.borrow().contains(&(token.0, channel)))
}

/// Opens a notify pass: pushes a fresh notified-token set.
pub(crate) fn begin_pass() -> PassGuard {
    PASSES.with(|p| p.borrow_mut().push(FxHashSet::default()));
    PassGuard
}

pub(crate) struct PassGuard;

impl Drop for PassGuard {
    fn drop(&mut self) {
        PASSES.with(|p| {
            p.borrow_mut().pop();
        });
    }
}

/// Whether `token` was already notified within the current pass, including
/// transitively through nested dispatches.
pub(crate) fn already_notified(token: SubscriberId) -> bool {
    PASSES.with(|p| {
        p.borrow()
            .last()
            .is_some_and(|pass| pass.contains(&token.0))
    })
}

/// Records `token` as notified in every pass up the stack, so enclosing
/// passes skip a subscriber that a nested dispatch already reached.
pub(crate) fn record_notified(token: SubscriberId) {
    PASSES.with(|p| {
        for pass in p.borrow_mut().iter_mut() {
            pass.insert(token.0);
        }
    });
}

/// Runs `job` now when no dispatch is draining on this thread, otherwise
/// queues it for the outermost drain.
///
/// The first caller becomes the drain loop and keeps pulling until the queue
/// is dry, so an invalidation chain of any length unwinds iteratively: each
/// recomputation's own notify pass enqueues the next link and returns. From
/// the outermost writer's point of view everything has settled synchronously
/// by the time its `set` returns.
pub(crate) fn run_or_enqueue(job: Box<dyn FnOnce()>) {
    QUEUE.with(|q| q.borrow_mut().push_back(job));
    if DRAINING.with(|d| d.get()) {
        return;
    }

    struct DrainGuard;
    impl Drop for DrainGuard {
        fn drop(&mut self) {
            // On panic, abandon queued work: the jobs belong to a propagation
            // pass whose state just unwound.
            QUEUE.with(|q| q.borrow_mut().clear());
            DRAINING.with(|d| d.set(false));
        }
    }

    DRAINING.with(|d| d.set(true));
    let _drain = DrainGuard;
    while let Some(job) = QUEUE.with(|q| q.borrow_mut().pop_front()) {
        job();
    }
}
