//! Computed cells: values derived from a callback, with automatically traced
//! dependencies.

mod inner;

use crate::{
    channel::Channel,
    errors::CellError,
    graph::tracker,
    rate_limit::RateLimit,
    subscription::{SubscriberId, Subscription, SubscriptionHandle},
};
use core::fmt::{Debug, Formatter};
use inner::{ComputedInner, ComputedState};
use or_poisoned::OrPoisoned;
use std::{
    hash::Hash,
    sync::{Arc, RwLock},
    time::Duration,
};

/// A cell whose value is produced by a callback.
///
/// Every evaluation runs inside a capture frame: the exact set of cells (and
/// sequence indices) read during the callback becomes the cell's dependency
/// set, and its invalidation subscriptions are reconciled to match. A
/// conditional branch that stops reading a cell therefore stops listening to
/// it on the next evaluation.
///
/// Recomputation is eager: when a dependency changes, the cell recomputes and
/// re-announces synchronously (long chains are flattened through an internal
/// queue rather than recursion). Reads are cached — reading twice without a
/// dependency change evaluates the callback once.
///
/// ```
/// use reactive_cells::prelude::*;
///
/// let count = ObservableCell::new(1);
/// let doubled = ComputedCell::new({
///     let count = count.clone();
///     move || count.value() * 2
/// });
/// assert_eq!(doubled.value(), 2);
/// count.set(21);
/// assert_eq!(doubled.value(), 42);
/// ```
pub struct ComputedCell<T> {
    state: Arc<ComputedState<T>>,
}

impl<T> Clone for ComputedCell<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Debug for ComputedCell<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedCell")
            .field("type", &std::any::type_name::<T>())
            .field("id", &self.state.token.0)
            .finish()
    }
}

impl<T> PartialEq for ComputedCell<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<T> Eq for ComputedCell<T> {}

impl<T> Hash for ComputedCell<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.state), state);
    }
}

impl<T> ComputedCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a read-only computed cell and evaluates it eagerly.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip_all,)
    )]
    pub fn new(compute: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::with_options(Arc::new(compute), None, false)
    }

    /// Creates a read-only computed cell whose first evaluation is deferred
    /// until the first read, peek, or subscription.
    pub fn deferred(compute: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::with_options(Arc::new(compute), None, true)
    }

    /// Creates a writable computed cell: writes are handed to `write`, and
    /// the round-tripped value is announced afterwards.
    pub fn writable(
        compute: impl Fn() -> T + Send + Sync + 'static,
        write: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self::with_options(Arc::new(compute), Some(Arc::new(write)), false)
    }

    /// Writable and deferred.
    pub fn writable_deferred(
        compute: impl Fn() -> T + Send + Sync + 'static,
        write: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self::with_options(Arc::new(compute), Some(Arc::new(write)), true)
    }

    fn with_options(
        compute: Arc<dyn Fn() -> T + Send + Sync>,
        write: Option<Arc<dyn Fn(T) + Send + Sync>>,
        defer: bool,
    ) -> Self {
        let state = Arc::new_cyclic(|weak| ComputedState {
            token: SubscriberId(crate::subscription::next_id()),
            inner: RwLock::new(ComputedInner {
                value: None,
                compute,
                write,
                is_valid: false,
                has_evaluated: false,
                is_disposed: false,
                dependencies: Default::default(),
                dependency_subs: Vec::new(),
                subscribers: Default::default(),
                limiter: None,
                pending: None,
                weak_self: weak.clone(),
            }),
        });
        let cell = Self { state };
        if !defer {
            cell.state.recompute();
        }
        cell
    }

    /// Current value.
    ///
    /// Reports the access to the tracker, recomputes first if a dependency
    /// has changed, and returns the frozen last value (with no recomputation
    /// and no tracking) once disposed. Correctness is never debounced: a
    /// rate-limited cell still recomputes here, only its notification waits.
    pub fn value(&self) -> T {
        {
            let inner = self.state.inner.read().or_poisoned();
            if inner.is_disposed {
                // frozen at the last computed value
                return inner
                    .value
                    .clone()
                    .expect("computed cell disposed before first evaluation");
            }
        }
        if tracker::is_capturing() {
            tracker::report_cell_read(self.state.any_source());
        }
        let stale = !self.state.inner.read().or_poisoned().is_valid;
        if stale {
            self.state.recompute();
        }
        self.state
            .inner
            .read()
            .or_poisoned()
            .value
            .clone()
            .expect("recomputed above")
    }

    /// Last announced value, without creating a dependency.
    ///
    /// Forces one evaluation if the cell has never run. While a debounce
    /// window is pending this returns the last-computed value as is — it
    /// reflects what was last announced, not what is live.
    pub fn peek(&self) -> T {
        let force = {
            let inner = self.state.inner.read().or_poisoned();
            !inner.is_disposed && inner.pending.is_none() && !inner.is_valid
        };
        if force {
            self.state.recompute();
        }
        self.state
            .inner
            .read()
            .or_poisoned()
            .value
            .clone()
            .expect("peeked a disposed cell that never evaluated")
    }

    /// Writes through the cell's write callback and announces the
    /// round-tripped value, so two-way-bound consumers observe what the cell
    /// now computes, not just what was written.
    pub fn try_set(&self, value: T) -> Result<(), CellError> {
        let write = {
            let inner = self.state.inner.read().or_poisoned();
            inner.write.clone()
        };
        let Some(write) = write else {
            return Err(CellError::ReadOnly);
        };
        write(value);
        let stale = {
            let inner = self.state.inner.read().or_poisoned();
            !inner.is_valid && !inner.is_disposed
        };
        if stale {
            self.state.recompute();
        }
        let current = self.state.inner.read().or_poisoned().value.clone();
        if let Some(current) = current {
            self.state.notify_value(&current);
        }
        Ok(())
    }

    /// Like [`try_set`](Self::try_set), but panics on a read-only cell.
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            panic!("{err}");
        }
    }

    /// Subscribes to `valueChanged`. A never-evaluated cell runs once first,
    /// so its dependency subscriptions exist before any external mutation can
    /// race the registration.
    pub fn subscribe(
        &self,
        callback: impl Fn(&T) + Send + Sync + 'static,
        token: SubscriberId,
    ) -> SubscriptionHandle {
        self.subscribe_channel(callback, Channel::ValueChanged, token)
    }

    /// Subscribes to an arbitrary channel, forcing a first evaluation if
    /// needed.
    pub fn subscribe_channel(
        &self,
        callback: impl Fn(&T) + Send + Sync + 'static,
        channel: Channel,
        token: SubscriberId,
    ) -> SubscriptionHandle {
        if !self.state.inner.read().or_poisoned().has_evaluated {
            self.state.recompute();
        }
        let (sub, handle) = Subscription::new(token, Arc::new(callback));
        self.state
            .inner
            .write()
            .or_poisoned()
            .subscribers
            .register(channel, sub);
        handle
    }

    /// Size of the current dependency set.
    pub fn dependency_count(&self) -> usize {
        self.state.inner.read().or_poisoned().dependencies.len()
    }

    /// Whether the cell was constructed without a write callback.
    pub fn is_read_only(&self) -> bool {
        self.state.inner.read().or_poisoned().write.is_none()
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.state.inner.read().or_poisoned().is_disposed
    }

    /// This cell's identity token.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.state.token
    }

    /// Stops the cell: cancels any pending debounce timer, disposes all
    /// dependency subscriptions, and freezes the cell at its last computed
    /// value. It never recomputes again. Calling this from inside the cell's
    /// own callback is honored: the evaluation in progress ends with zero
    /// dependencies.
    pub fn dispose(&self) {
        let mut inner = self.state.inner.write().or_poisoned();
        inner.is_disposed = true;
        for (_, handle) in &inner.dependency_subs {
            handle.dispose();
        }
        inner.dependency_subs.clear();
        inner.dependencies.clear();
        inner.pending = None;
        if let Some(limiter) = &inner.limiter {
            limiter.timer.cancel();
        }
    }

    /// Configures a debounce window. While a burst is in progress the cell
    /// defers both recomputation and notification; forced reads still see
    /// fresh values, and a burst whose net result equals the pre-burst value
    /// announces nothing.
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
}
