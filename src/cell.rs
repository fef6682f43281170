//! Plain observable cells.

use crate::{
    channel::Channel,
    graph::{
        source::{AnySource, Source, SubscribedIndex},
        tracker,
    },
    rate_limit::{self, PendingWrite, RateLimit},
    subscription::{ChannelRegistry, SubscriberId, Subscription, SubscriptionHandle},
};
use core::fmt::{Debug, Formatter};
use or_poisoned::OrPoisoned;
use std::{
    hash::Hash,
    sync::{Arc, RwLock, Weak},
    time::Duration,
};

/// A boxed mutable value that notifies subscribers when it changes.
///
/// Cells are cheap clonable handles over shared state: cloning a cell gives a
/// second handle to the same value and subscriber registry. Reading through
/// [`value`](Self::value) inside a computed cell's callback registers this
/// cell as a dependency of that computation; [`peek`](Self::peek) reads
/// without registering anything.
pub struct ObservableCell<T> {
    pub(crate) state: Arc<CellState<T>>,
}

pub(crate) struct CellState<T> {
    pub(crate) token: SubscriberId,
    pub(crate) inner: RwLock<CellInner<T>>,
}

pub(crate) struct CellInner<T> {
    pub(crate) value: T,
    pub(crate) subscribers: ChannelRegistry<T>,
    /// Set transiently while a read is being reported to the access tracker;
    /// a write landing inside that window suppresses its own `valueChanged`.
    pub(crate) is_accessed: bool,
    pub(crate) limiter: Option<RateLimit<T>>,
    pub(crate) pending: Option<PendingWrite<T>>,
}

impl<T> Clone for ObservableCell<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Debug for ObservableCell<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableCell")
            .field("type", &std::any::type_name::<T>())
            .field("id", &self.state.token.0)
            .finish()
    }
}

impl<T> PartialEq for ObservableCell<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl<T> Eq for ObservableCell<T> {}

impl<T> Hash for ObservableCell<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.state), state);
    }
}

impl<T> Default for ObservableCell<T>
where
    T: Default,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> ObservableCell<T> {
    /// Creates a cell holding `value`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip_all,)
    )]
    pub fn new(value: T) -> Self {
        Self {
            state: Arc::new(CellState {
                token: SubscriberId(crate::subscription::next_id()),
                inner: RwLock::new(CellInner {
                    value,
                    subscribers: ChannelRegistry::default(),
                    is_accessed: false,
                    limiter: None,
                    pending: None,
                }),
            }),
        }
    }

    /// This cell's identity token, usable as the `token` argument when
    /// subscribing it to another cell (enabling cycle suppression between
    /// the two).
    pub fn subscriber_id(&self) -> SubscriberId {
        self.state.token
    }

    /// Number of live subscriptions across all channels.
    pub fn subscription_count(&self) -> usize {
        self.state.inner.read().or_poisoned().subscribers.live_total()
    }

    /// Whether any channel has a live subscription.
    pub fn has_subscribers(&self) -> bool {
        self.subscription_count() > 0
    }

    /// Whether `channel` has a live subscription.
    pub fn has_channel_subscribers(&self, channel: Channel) -> bool {
        self.state
            .inner
            .read()
            .or_poisoned()
            .subscribers
            .has_live(channel)
    }

    /// Subscribes `callback` to `valueChanged`.
    pub fn subscribe(
        &self,
        callback: impl Fn(&T) + Send + Sync + 'static,
        token: SubscriberId,
    ) -> SubscriptionHandle {
        self.subscribe_channel(callback, Channel::ValueChanged, token)
    }

    /// Subscribes `callback` to an arbitrary channel.
    pub fn subscribe_channel(
        &self,
        callback: impl Fn(&T) + Send + Sync + 'static,
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
}

impl<T> ObservableCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Current value, registered as a dependency of the computation being
    /// evaluated, if any.
    pub fn value(&self) -> T {
        self.report_access();
        self.state.inner.read().or_poisoned().value.clone()
    }

    /// Current value, without registering a dependency.
    pub fn peek(&self) -> T {
        self.state.inner.read().or_poisoned().value.clone()
    }

    /// Assigns a new value.
    ///
    /// Fires `beforeValueChanged` with the old value (unless a debounce
    /// window is already pending), assigns, then either fires `valueChanged`
    /// or arms/restarts the cell's debounce window.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip_all,)
    )]
    pub fn set(&self, value: T) {
        let (old, mid_delay) = {
            let inner = self.state.inner.read().or_poisoned();
            (inner.value.clone(), inner.pending.is_some())
        };
        if !mid_delay {
            self.state.dispatch(Channel::BeforeValueChanged, &old);
        }
        enum After<T> {
            Notify(T),
            Arm(Duration),
            Quiet,
        }
        let after = {
            let mut guard = self.state.inner.write().or_poisoned();
            let inner = &mut *guard;
            inner.value = value;
            if let Some(limiter) = &inner.limiter {
                let window = limiter.window;
                if inner.pending.is_none() {
                    inner.pending = Some(PendingWrite { original: old });
                }
                After::Arm(window)
            } else if inner.is_accessed {
                After::Quiet
            } else {
                After::Notify(inner.value.clone())
            }
        };
        match after {
            After::Notify(new) => self.state.dispatch(Channel::ValueChanged, &new),
            After::Arm(window) => self.arm_timer(window),
            After::Quiet => {}
        }
    }

    /// Notifies `valueChanged` subscribers with `value`, honoring the cell's
    /// debounce window if one is configured.
    pub fn notify_subscribers(&self, value: &T) {
        self.notify_channel(value, Channel::ValueChanged);
    }

    /// Notifies an arbitrary channel. `valueChanged` is debounced when a rate
    /// limit is configured; every other channel dispatches immediately.
    pub fn notify_channel(&self, value: &T, channel: Channel) {
        if channel == Channel::ValueChanged {
            let arm = {
                let mut guard = self.state.inner.write().or_poisoned();
                let inner = &mut *guard;
                match &inner.limiter {
                    Some(limiter) => {
                        let window = limiter.window;
                        if inner.pending.is_none() {
                            inner.pending = Some(PendingWrite {
                                original: inner.value.clone(),
                            });
                        }
                        Some(window)
                    }
                    None => None,
                }
            };
            if let Some(window) = arm {
                self.arm_timer(window);
                return;
            }
        }
        self.state.dispatch(channel, value);
    }

    /// Configures a debounce window: bursts of writes inside `window` produce
    /// at most one `valueChanged`, and none at all if the final value equals
    /// the value the burst started from.
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
            crate::errors::CellError::InvalidArgument("rate limit window must be non-zero")
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

    fn report_access(&self) {
        if !tracker::is_capturing() {
            return;
        }
        self.state.inner.write().or_poisoned().is_accessed = true;
        tracker::report_cell_read(self.any_source());
        self.state.inner.write().or_poisoned().is_accessed = false;
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

impl<T> CellState<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn dispatch(&self, channel: Channel, payload: &T) {
        crate::subscription::run_notify_pass(
            self.token,
            channel,
            payload,
            |i| self.inner.read().or_poisoned().subscribers.get_at(channel, i),
            |_| true,
            || self.inner.write().or_poisoned().subscribers.prune(channel),
        );
    }

    /// Debounce window elapsed: announce the net change, unless the value
    /// reverted to what the burst started from.
    fn fire_pending(&self, generation: u64) {
        let payload = {
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
            if same(&inner.value, &pending.original) {
                None
            } else {
                Some(inner.value.clone())
            }
        };
        if let Some(value) = payload {
            self.dispatch(Channel::ValueChanged, &value);
        }
    }
}

impl<T> Source for CellState<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe_invalidation(
        &self,
        _index: SubscribedIndex,
        token: SubscriberId,
        callback: Arc<dyn Fn() + Send + Sync>,
    ) -> SubscriptionHandle {
        let (sub, handle) =
            Subscription::new(token, Arc::new(move |_: &T| callback()));
        self.inner
            .write()
            .or_poisoned()
            .subscribers
            .register(Channel::ValueChanged, sub);
        handle
    }
}
