//! Observable sequences: ordered collections that report index-addressed
//! change diffs.

use crate::{
    channel::Channel,
    errors::CellError,
    graph::{
        source::{AnySource, Source, SubscribedIndex},
        tracker,
    },
    rate_limit::{self, PendingBurst, RateLimit},
    subscription::{
        run_notify_pass, ChannelRegistry, SubscriberId, Subscription, SubscriptionHandle,
    },
};
use core::fmt::{Debug, Formatter};
use or_poisoned::OrPoisoned;
use std::{
    cmp::Ordering as CmpOrdering,
    hash::Hash,
    sync::{Arc, RwLock, Weak},
    time::Duration,
};

/// Whether a diff entry adds or removes a value at its index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The value now occupies the index.
    Add,
    /// The value no longer occupies the index.
    Remove,
}

/// One entry of an index-addressed change diff.
///
/// A value that changes position appears as a `Remove` at its old index and
/// an `Add` at its new one; there is no "move" kind.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceChange<T> {
    /// Whether the value arrived at or left the index.
    pub kind: ChangeKind,
    /// The affected position.
    pub index: usize,
    /// The value that arrived or left.
    pub value: T,
}

impl<T> SequenceChange<T> {
    /// An `Add` entry.
    pub fn add(index: usize, value: T) -> Self {
        Self {
            kind: ChangeKind::Add,
            index,
            value,
        }
    }

    /// A `Remove` entry.
    pub fn remove(index: usize, value: T) -> Self {
        Self {
            kind: ChangeKind::Remove,
            index,
            value,
        }
    }
}

/// An ordered, mutable sequence whose mutations produce index-tagged
/// add/remove diffs.
///
/// A sequence is a cell over its backing vector — the value channels carry
/// the whole vector — augmented with the `arrayChange` channel, whose
/// subscriptions may be filtered to one index. Reading one element inside a
/// computed cell's callback makes that computation depend on that index
/// alone: mutations that leave the index untouched do not re-run it.
pub struct ObservableSequence<T> {
    state: Arc<SeqState<T>>,
}

pub(crate) struct SeqState<T> {
    token: SubscriberId,
    inner: RwLock<SeqInner<T>>,
}

struct SeqInner<T> {
    items: Vec<T>,
    subscribers: ChannelRegistry<Vec<T>>,
    array_subs: ArraySubscriberList<T>,
    is_accessed: bool,
    limiter: Option<RateLimit<Vec<T>>>,
    pending: Option<PendingBurst<T>>,
}

struct ArrayEntry<T> {
    filter: SubscribedIndex,
    sub: Subscription<[SequenceChange<T>]>,
}

struct ArraySubscriberList<T>(Vec<ArrayEntry<T>>);

impl<T> Default for ArraySubscriberList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> ArraySubscriberList<T> {
    fn push(&mut self, filter: SubscribedIndex, sub: Subscription<[SequenceChange<T>]>) {
        self.0.push(ArrayEntry { filter, sub });
    }

    fn get(&self, index: usize) -> Option<Subscription<[SequenceChange<T>]>> {
        self.0.get(index).map(|entry| entry.sub.clone())
    }

    /// Index-filtered delivery: an `At(i)` subscription only sees diffs that
    /// touch `i`; the all-changes sentinel sees everything.
    fn matches(&self, position: usize, changes: &[SequenceChange<T>]) -> bool {
        match self.0.get(position) {
            Some(entry) => match entry.filter {
                SubscribedIndex::At(index) => changes.iter().any(|c| c.index == index),
                SubscribedIndex::All | SubscribedIndex::Cell => true,
            },
            None => true,
        }
    }

    fn live_count(&self) -> usize {
        self.0.iter().filter(|e| !e.sub.is_removed()).count()
    }

    fn prune(&mut self) {
        self.0.retain(|entry| {
            if entry.sub.is_removed() {
                entry
                    .sub
                    .pruned
                    .store(true, std::sync::atomic::Ordering::Release);
                false
            } else {
                true
            }
        });
    }
}

impl<T> Clone for ObservableSequence<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Debug for ObservableSequence<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableSequence")
            .field("type", &std::any::type_name::<T>())
            .field("id", &self.state.token.0)
            .finish()
    }
}

impl<T> PartialEq for ObservableSequence<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<T> Eq for ObservableSequence<T> {}

impl<T> Hash for ObservableSequence<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.state), state);
    }
}

impl<T> Default for ObservableSequence<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> ObservableSequence<T> {
    /// Creates a sequence from any iterable of items.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip_all,)
    )]
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            state: Arc::new(SeqState {
                token: SubscriberId(crate::subscription::next_id()),
                inner: RwLock::new(SeqInner {
                    items: items.into_iter().collect(),
                    subscribers: ChannelRegistry::default(),
                    array_subs: ArraySubscriberList::default(),
                    is_accessed: false,
                    limiter: None,
                    pending: None,
                }),
            }),
        }
    }

    /// This sequence's identity token.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.state.token
    }

    /// Number of live subscriptions across the value channels and the array
    /// channel.
    pub fn subscription_count(&self) -> usize {
        let inner = self.state.inner.read().or_poisoned();
        inner.subscribers.live_total() + inner.array_subs.live_count()
    }

    /// Whether any channel has a live subscription.
    pub fn has_subscribers(&self) -> bool {
        self.subscription_count() > 0
    }

    /// Whether `channel` has a live subscription.
    pub fn has_channel_subscribers(&self, channel: Channel) -> bool {
        let inner = self.state.inner.read().or_poisoned();
        match channel {
            Channel::ArrayChange => inner.array_subs.live_count() > 0,
            other => inner.subscribers.has_live(other),
        }
    }

    /// Subscribes `callback` to `valueChanged`; it receives the whole backing
    /// vector.
    pub fn subscribe(
        &self,
        callback: impl Fn(&Vec<T>) + Send + Sync + 'static,
        token: SubscriberId,
    ) -> SubscriptionHandle {
        self.subscribe_channel(callback, Channel::ValueChanged, token)
    }

    /// Subscribes `callback` to an arbitrary value channel.
    pub fn subscribe_channel(
        &self,
        callback: impl Fn(&Vec<T>) + Send + Sync + 'static,
        channel: Channel,
        token: SubscriberId,
    ) -> SubscriptionHandle {
        let (sub, handle) = Subscription::new(token, Arc::new(callback));
        self.state
            .inner
            .write()
            .or_poisoned()
            .subscribers
            .register(channel, sub);
        handle
    }

    /// Subscribes to every change diff the sequence produces.
    pub fn subscribe_array_change(
        &self,
        callback: impl Fn(&[SequenceChange<T>]) + Send + Sync + 'static,
        token: SubscriberId,
    ) -> SubscriptionHandle {
        self.register_array(SubscribedIndex::All, token, Arc::new(callback))
    }

    /// Subscribes to diffs touching one specific index only.
    pub fn subscribe_index_change(
        &self,
        callback: impl Fn(&[SequenceChange<T>]) + Send + Sync + 'static,
        token: SubscriberId,
        index: usize,
    ) -> SubscriptionHandle {
        self.register_array(SubscribedIndex::At(index), token, Arc::new(callback))
    }

    fn register_array(
        &self,
        filter: SubscribedIndex,
        token: SubscriberId,
        callback: Arc<dyn Fn(&[SequenceChange<T>]) + Send + Sync>,
    ) -> SubscriptionHandle {
        let (sub, handle) = Subscription::new(token, callback);
        self.state
            .inner
            .write()
            .or_poisoned()
            .array_subs
            .push(filter, sub);
        handle
    }
}

impl<T> ObservableSequence<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Snapshot of the backing vector, registered as a whole-sequence
    /// dependency of the computation being evaluated, if any.
    pub fn value(&self) -> Vec<T> {
        self.report_index_access(SubscribedIndex::All);
        self.state.inner.read().or_poisoned().items.clone()
    }

    /// Element at `index`, registered as an index-scoped dependency.
    ///
    /// # Panics
    /// Panics when `index` is out of bounds.
    pub fn get(&self, index: usize) -> T {
        self.report_index_access(SubscribedIndex::At(index));
        self.state.inner.read().or_poisoned().items[index].clone()
    }

    /// Snapshot without registering a dependency.
    pub fn peek(&self) -> Vec<T> {
        self.state.inner.read().or_poisoned().items.clone()
    }

    /// Element without registering a dependency.
    pub fn peek_at(&self, index: usize) -> Option<T> {
        self.state.inner.read().or_poisoned().items.get(index).cloned()
    }

    /// Tracked length (a whole-sequence dependency, like [`value`](Self::value)).
    pub fn len(&self) -> usize {
        self.report_index_access(SubscribedIndex::All);
        self.state.inner.read().or_poisoned().items.len()
    }

    /// Tracked emptiness check.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends an item; the diff is a single add at the end.
    pub fn push(&self, item: T) {
        self.apply_mutation(false, move |items, listening| {
            let index = items.len();
            items.push(item);
            let changes = if listening {
                vec![SequenceChange::add(index, items[index].clone())]
            } else {
                Vec::new()
            };
            ((), changes)
        });
    }

    /// Inserts at `index`. Every element behind the insertion point shifts,
    /// producing one remove(old index) + add(new index) pair each, plus the
    /// add for the inserted item.
    ///
    /// # Panics
    /// Panics when `index > len`.
    pub fn insert(&self, index: usize, item: T) {
        self.apply_mutation(false, move |items, listening| {
            items.insert(index, item);
            let changes = if listening {
                let mut changes = shift_changes(items, index + 1, 1);
                changes.push(SequenceChange::add(index, items[index].clone()));
                changes
            } else {
                Vec::new()
            };
            ((), changes)
        });
    }

    /// Inserts every item of `values` starting at `index`.
    ///
    /// # Panics
    /// Panics when `index > len`.
    pub fn insert_range(&self, index: usize, values: impl IntoIterator<Item = T>) {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() {
            return;
        }
        self.apply_mutation(false, move |items, listening| {
            let count = values.len();
            items.splice(index..index, values);
            let changes = if listening {
                let mut changes = shift_changes(items, index + count, count as isize);
                for (offset, item) in items[index..index + count].iter().enumerate() {
                    changes.push(SequenceChange::add(index + offset, item.clone()));
                }
                changes
            } else {
                Vec::new()
            };
            ((), changes)
        });
    }

    /// Appends every item of `values`.
    pub fn append_range(&self, values: impl IntoIterator<Item = T>) {
        let index = self.state.inner.read().or_poisoned().items.len();
        self.insert_range(index, values);
    }

    /// Removes and returns the element at `index`. Every element behind it
    /// shifts forward, producing one remove + add pair each.
    ///
    /// # Panics
    /// Panics when `index` is out of bounds.
    pub fn remove_at(&self, index: usize) -> T {
        self.apply_mutation(false, move |items, listening| {
            let removed = items.remove(index);
            let changes = if listening {
                let mut changes = shift_changes(items, index, -1);
                changes.push(SequenceChange::remove(index, removed.clone()));
                changes
            } else {
                Vec::new()
            };
            (removed, changes)
        })
    }

    /// Removes `count` elements starting at `index`.
    ///
    /// # Panics
    /// Panics when the range is out of bounds.
    pub fn remove_range(&self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.apply_mutation(false, move |items, listening| {
            let removed: Vec<T> = items.drain(index..index + count).collect();
            let changes = if listening {
                let mut changes = shift_changes(items, index, -(count as isize));
                for (offset, value) in removed.iter().enumerate() {
                    changes.push(SequenceChange::remove(index + offset, value.clone()));
                }
                changes
            } else {
                Vec::new()
            };
            ((), changes)
        });
    }

    /// Removes the last element, if any.
    pub fn pop(&self) -> Option<T> {
        let len = self.state.inner.read().or_poisoned().items.len();
        if len == 0 {
            return None;
        }
        Some(self.remove_at(len - 1))
    }

    /// Removes every element; the diff is one remove per index.
    pub fn clear(&self) {
        self.apply_mutation(false, |items, listening| {
            let changes = if listening {
                items
                    .iter()
                    .enumerate()
                    .map(|(index, value)| SequenceChange::remove(index, value.clone()))
                    .collect()
            } else {
                Vec::new()
            };
            items.clear();
            ((), changes)
        });
    }

    /// Replaces the element at `index`. The diff is exactly one remove of the
    /// old value and one add of the new value at that index — nothing shifts.
    /// Value-channel subscribers are notified with the updated vector.
    ///
    /// # Panics
    /// Panics when `index` is out of bounds.
    pub fn set(&self, index: usize, value: T) {
        self.apply_mutation(true, move |items, listening| {
            let old = std::mem::replace(&mut items[index], value);
            let changes = if listening {
                vec![
                    SequenceChange::remove(index, old),
                    SequenceChange::add(index, items[index].clone()),
                ]
            } else {
                Vec::new()
            };
            ((), changes)
        });
    }

    /// Replaces the whole backing vector, firing `beforeValueChanged` and
    /// `valueChanged` like a plain cell write plus a pairwise diff on the
    /// array channel.
    pub fn replace(&self, values: Vec<T>)
    where
        T: PartialEq,
    {
        let (old, mid_delay) = {
            let inner = self.state.inner.read().or_poisoned();
            (inner.items.clone(), inner.pending.is_some())
        };
        if !mid_delay {
            self.state.dispatch(Channel::BeforeValueChanged, &old);
        }
        self.apply_mutation(true, move |items, listening| {
            let changes = if listening {
                pairwise_changes(items, &values)
            } else {
                Vec::new()
            };
            *items = values;
            ((), changes)
        });
    }

    /// Notifies `valueChanged` subscribers with the current vector, honoring
    /// the debounce window if one is configured.
    pub fn notify_subscribers(&self) {
        self.apply_mutation(true, |_, _| ((), Vec::new()));
    }

    /// Intentionally unsupported: bulk predicate removal has no defined
    /// change-diff semantics. Never mutates.
    pub fn remove_all(&self, _predicate: impl Fn(&T) -> bool) -> Result<usize, CellError> {
        Err(CellError::NotImplemented(
            "bulk predicate removal has no change-diff semantics",
        ))
    }

    /// Configures a debounce window: diffs produced inside `window` are
    /// merged per index and announced once the window goes quiet.
    ///
    /// # Panics
    /// Panics on a zero window.
    pub fn rate_limit(self, window: Duration) -> Self
    where
        T: PartialEq,
    {
        assert!(
            !window.is_zero(),
            "{}",
            CellError::InvalidArgument("rate limit window must be non-zero")
        );
        self.state.inner.write().or_poisoned().limiter = Some(RateLimit::new(window));
        self
    }

    pub(crate) fn any_source(&self) -> AnySource {
        AnySource(
            self.state.token.0,
            Arc::downgrade(&self.state) as Weak<dyn Source + Send + Sync>,
        )
    }

    fn report_index_access(&self, index: SubscribedIndex) {
        if !tracker::is_capturing() {
            return;
        }
        self.state.inner.write().or_poisoned().is_accessed = true;
        tracker::report_index_read(self.any_source(), index);
        self.state.inner.write().or_poisoned().is_accessed = false;
    }

    /// Runs one mutation: snapshots the pre-burst state if a debounce window
    /// is opening, applies `mutate` (which returns its own result plus the
    /// diff, built only when `listening`), then dispatches or defers.
    fn apply_mutation<R>(
        &self,
        fires_value_changed: bool,
        mutate: impl FnOnce(&mut Vec<T>, bool) -> (R, Vec<SequenceChange<T>>),
    ) -> R {
        enum After<T> {
            Immediate {
                value: Option<Vec<T>>,
                changes: Vec<SequenceChange<T>>,
            },
            Arm(Duration),
            Quiet,
        }
        let (result, after) = {
            let mut guard = self.state.inner.write().or_poisoned();
            let inner = &mut *guard;
            let listening = inner.array_subs.live_count() > 0;
            let limited = inner.limiter.is_some();
            if limited && inner.pending.is_none() && (listening || fires_value_changed) {
                inner.pending = Some(PendingBurst::new(inner.items.clone()));
            }
            let (result, changes) = mutate(&mut inner.items, listening);
            let after = match &inner.limiter {
                Some(limiter) => {
                    let window = limiter.window;
                    match &mut inner.pending {
                        Some(pending) => {
                            rate_limit::merge_changes(&mut pending.slots, &changes);
                            if fires_value_changed {
                                pending.value_change_attempted = true;
                            }
                            After::Arm(window)
                        }
                        None => After::Quiet,
                    }
                }
                None => After::Immediate {
                    value: (fires_value_changed && !inner.is_accessed)
                        .then(|| inner.items.clone()),
                    changes,
                },
            };
            (result, after)
        };
        match after {
            After::Immediate { value, changes } => {
                if let Some(value) = &value {
                    self.state.dispatch(Channel::ValueChanged, value);
                }
                if !changes.is_empty() {
                    self.state.dispatch_array(&changes);
                }
            }
            After::Arm(window) => self.arm_timer(window),
            After::Quiet => {}
        }
        result
    }

    fn arm_timer(&self, window: Duration) {
        let (handle, generation) = {
            let inner = self.state.inner.read().or_poisoned();
            let Some(limiter) = &inner.limiter else { return };
            (limiter.timer.handle(), limiter.timer.next_generation())
        };
        let weak = Arc::downgrade(&self.state);
        rate_limit::spawn_fire(handle, generation, window, move || {
            if let Some(state) = weak.upgrade() {
                state.fire_pending(generation);
            }
        });
    }
}

impl<T> ObservableSequence<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Tracked containment check (a whole-sequence dependency).
    pub fn contains(&self, item: &T) -> bool {
        self.report_index_access(SubscribedIndex::All);
        self.state.inner.read().or_poisoned().items.contains(item)
    }

    /// Tracked position lookup (a whole-sequence dependency).
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.report_index_access(SubscribedIndex::All);
        self.state
            .inner
            .read()
            .or_poisoned()
            .items
            .iter()
            .position(|x| x == item)
    }

    /// Removes the first occurrence of `item`, if present.
    pub fn remove_item(&self, item: &T) -> bool {
        let index = {
            let inner = self.state.inner.read().or_poisoned();
            inner.items.iter().position(|x| x == item)
        };
        match index {
            Some(index) => {
                self.remove_at(index);
                true
            }
            None => false,
        }
    }

    /// Sorts the whole sequence with `compare`. The diff contains a remove +
    /// add pair for each position whose occupant actually changed; stable
    /// positions are not reported.
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> CmpOrdering) {
        let len = self.state.inner.read().or_poisoned().items.len();
        self.sort_range_by(0, len, compare);
    }

    /// Sorts by the natural order.
    pub fn sort(&self)
    where
        T: Ord,
    {
        self.sort_by(T::cmp);
    }

    /// Sorts `count` elements starting at `index`.
    ///
    /// # Panics
    /// Panics when the range is out of bounds.
    pub fn sort_range_by(
        &self,
        index: usize,
        count: usize,
        mut compare: impl FnMut(&T, &T) -> CmpOrdering,
    ) {
        self.apply_mutation(false, move |items, listening| {
            let before = listening.then(|| items.clone());
            items[index..index + count].sort_by(&mut compare);
            let changes = match before {
                Some(before) => pairwise_changes(&before, items),
                None => Vec::new(),
            };
            ((), changes)
        });
    }

    /// Reverses the whole sequence; stable positions (the middle of an
    /// odd-length sequence) are not reported.
    pub fn reverse(&self) {
        let len = self.state.inner.read().or_poisoned().items.len();
        self.reverse_range(0, len);
    }

    /// Reverses `count` elements starting at `index`.
    ///
    /// # Panics
    /// Panics when the range is out of bounds.
    pub fn reverse_range(&self, index: usize, count: usize) {
        self.apply_mutation(false, move |items, listening| {
            let before = listening.then(|| items.clone());
            items[index..index + count].reverse();
            let changes = match before {
                Some(before) => pairwise_changes(&before, items),
                None => Vec::new(),
            };
            ((), changes)
        });
    }
}

impl<T> SeqState<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn dispatch(&self, channel: Channel, payload: &Vec<T>) {
        run_notify_pass(
            self.token,
            channel,
            payload,
            |i| self.inner.read().or_poisoned().subscribers.get_at(channel, i),
            |_| true,
            || self.inner.write().or_poisoned().subscribers.prune(channel),
        );
    }

    fn dispatch_array(&self, changes: &[SequenceChange<T>]) {
        run_notify_pass(
            self.token,
            Channel::ArrayChange,
            changes,
            |i| self.inner.read().or_poisoned().array_subs.get(i),
            |i| self.inner.read().or_poisoned().array_subs.matches(i, changes),
            || self.inner.write().or_poisoned().array_subs.prune(),
        );
    }

    /// Debounce window elapsed: announce the merged diff, and the new vector
    /// when a value-channel notification was held back and the items did not
    /// revert to the pre-burst snapshot.
    fn fire_pending(&self, generation: u64) {
        let (changes, value_payload) = {
            let mut guard = self.inner.write().or_poisoned();
            let inner = &mut *guard;
            let Some(limiter) = &inner.limiter else {
                return;
            };
            if limiter.timer.current() != generation {
                return;
            }
            let same = limiter.same;
            let Some(pending) = inner.pending.take() else {
                return;
            };
            let changes = rate_limit::flatten_changes(pending.slots);
            let value_payload = (pending.value_change_attempted
                && !same(&inner.items, &pending.original_items))
            .then(|| inner.items.clone());
            (changes, value_payload)
        };
        if let Some(value) = &value_payload {
            self.dispatch(Channel::ValueChanged, value);
        }
        if !changes.is_empty() {
            self.dispatch_array(&changes);
        }
    }
}

impl<T> Source for SeqState<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe_invalidation(
        &self,
        index: SubscribedIndex,
        token: SubscriberId,
        callback: Arc<dyn Fn() + Send + Sync>,
    ) -> SubscriptionHandle {
        let filter = match index {
            SubscribedIndex::Cell => SubscribedIndex::All,
            other => other,
        };
        let (sub, handle) = Subscription::new(
            token,
            Arc::new(move |_: &[SequenceChange<T>]| callback()),
        );
        self.inner.write().or_poisoned().array_subs.push(filter, sub);
        handle
    }
}

/// Remove + add pairs for every element that shifted position.
///
/// `first_new` is the first post-mutation position holding a shifted element;
/// `offset` is how far each one moved (positive after an insert, negative
/// after a removal).
fn shift_changes<T: Clone>(
    items: &[T],
    first_new: usize,
    offset: isize,
) -> Vec<SequenceChange<T>> {
    let mut changes = Vec::new();
    for (position, item) in items.iter().enumerate().skip(first_new) {
        let old = (position as isize - offset) as usize;
        changes.push(SequenceChange::remove(old, item.clone()));
        changes.push(SequenceChange::add(position, item.clone()));
    }
    changes
}

/// Positionwise diff of two vectors: entries only for positions whose
/// occupant changed, plus adds/removes for the length difference.
fn pairwise_changes<T: Clone + PartialEq>(old: &[T], new: &[T]) -> Vec<SequenceChange<T>> {
    let mut changes = Vec::new();
    for index in 0..old.len().max(new.len()) {
        match (old.get(index), new.get(index)) {
            (Some(before), Some(after)) if before == after => {}
            (Some(before), Some(after)) => {
                changes.push(SequenceChange::remove(index, before.clone()));
                changes.push(SequenceChange::add(index, after.clone()));
            }
            (Some(before), None) => {
                changes.push(SequenceChange::remove(index, before.clone()));
            }
            (None, Some(after)) => {
                changes.push(SequenceChange::add(index, after.clone()));
            }
            (None, None) => {}
        }
    }
    changes
}
