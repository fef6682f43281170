//! Debounce windows for cells and sequences.
//!
//! A rate limit holds back `valueChanged` (and `arrayChange`) notifications
//! while writes keep arriving, then announces the net result once the window
//! goes quiet. Timers are generation-counted: arming bumps the generation and
//! spawns a sleeper for it; any later arm or cancel bumps again, so only the
//! newest sleeper's firing is honored. No blocking, no exception-based
//! cancellation.

use crate::sequence::{ChangeKind, SequenceChange};
use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

/// Monotonic generation counter backing one cell's debounce timer.
pub(crate) struct Timer {
    generation: Arc<AtomicU64>,
}

impl Timer {
    pub(crate) fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Invalidates any sleeper in flight and returns the generation a new
    /// sleeper must carry to be honored.
    pub(crate) fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The generation that is currently allowed to fire.
    pub(crate) fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidates any sleeper in flight without arming a new one.
    pub(crate) fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.generation)
    }
}

/// Sleeps for `window` and invokes `fire` if `generation` is still current.
pub(crate) fn spawn_fire(
    handle: Arc<AtomicU64>,
    generation: u64,
    window: Duration,
    fire: impl FnOnce() + Send + 'static,
) {
    thread::spawn(move || {
        thread::sleep(window);
        if handle.load(Ordering::SeqCst) == generation {
            fire();
        }
    });
}

/// Debounce configuration attached to a cell.
pub(crate) struct RateLimit<T> {
    pub(crate) window: Duration,
    /// Equality used for the revert short-circuit; captured at configuration
    /// time so the inner types stay free of `PartialEq` bounds.
    pub(crate) same: fn(&T, &T) -> bool,
    pub(crate) timer: Timer,
}

impl<T> RateLimit<T> {
    pub(crate) fn new(window: Duration) -> Self
    where
        T: PartialEq,
    {
        Self {
            window,
            same: T::eq,
            timer: Timer::new(),
        }
    }
}

/// A value-cell burst in progress: the pre-burst value, kept for the
/// revert-to-original short-circuit when the window elapses.
pub(crate) struct PendingWrite<T> {
    pub(crate) original: T,
}

/// A sequence burst in progress.
pub(crate) struct PendingBurst<T> {
    /// Snapshot of the items before the first write of the burst.
    pub(crate) original_items: Vec<T>,
    /// Net change per index, merged across every diff of the burst.
    pub(crate) slots: BTreeMap<usize, PendingSlot<T>>,
    /// Whether any write of the burst would have fired `valueChanged`.
    pub(crate) value_change_attempted: bool,
}

impl<T> PendingBurst<T> {
    pub(crate) fn new(original_items: Vec<T>) -> Self {
        Self {
            original_items,
            slots: BTreeMap::new(),
            value_change_attempted: false,
        }
    }
}

/// Net pending change at one index: at most one remove (the pre-burst
/// occupant) and one add (the newest value).
pub(crate) struct PendingSlot<T> {
    pub(crate) removed: Option<T>,
    pub(crate) added: Option<T>,
}

impl<T> Default for PendingSlot<T> {
    fn default() -> Self {
        Self {
            removed: None,
            added: None,
        }
    }
}

/// Merges one freshly-produced diff into the burst's per-index slots.
///
/// Full outer join on index: an index with no prior pending change passes
/// through unchanged; an index already pending keeps its original (pre-burst)
/// remove and adopts the incoming add, dropping the redundant intermediate
/// entries; when the incoming side has no add, the pending add survives.
pub(crate) fn merge_changes<T: Clone>(
    slots: &mut BTreeMap<usize, PendingSlot<T>>,
    incoming: &[SequenceChange<T>],
) {
    let mut grouped: BTreeMap<usize, PendingSlot<T>> = BTreeMap::new();
    for change in incoming {
        let slot = grouped.entry(change.index).or_default();
        match change.kind {
            ChangeKind::Add => slot.added = Some(change.value.clone()),
            ChangeKind::Remove => slot.removed = Some(change.value.clone()),
        }
    }
    for (index, fresh) in grouped {
        match slots.entry(index) {
            Entry::Vacant(entry) => {
                entry.insert(fresh);
            }
            Entry::Occupied(mut entry) => {
                if fresh.added.is_some() {
                    entry.get_mut().added = fresh.added;
                }
            }
        }
    }
}

/// Flattens merged slots into a diff list ordered by index, remove before add
/// at each index.
pub(crate) fn flatten_changes<T>(
    slots: BTreeMap<usize, PendingSlot<T>>,
) -> Vec<SequenceChange<T>> {
    let mut changes = Vec::new();
    for (index, slot) in slots {
        if let Some(value) = slot.removed {
            changes.push(SequenceChange::remove(index, value));
        }
        if let Some(value) = slot.added {
            changes.push(SequenceChange::add(index, value));
        }
    }
    changes
}
