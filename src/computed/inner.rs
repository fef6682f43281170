//! Shared state and algorithms behind [`ComputedCell`](super::ComputedCell).

use crate::{
    channel::Channel,
    graph::{
        dispatch,
        source::{AnySource, DependencyRef, Source, SubscribedIndex},
        tracker::{self, DependencySet},
    },
    rate_limit::{self, PendingWrite, RateLimit},
    subscription::{ChannelRegistry, SubscriberId, Subscription, SubscriptionHandle},
};
use or_poisoned::OrPoisoned;
use std::{
    fmt::Debug,
    sync::{Arc, RwLock, Weak},
    time::Duration,
};

pub(crate) struct ComputedState<T> {
    pub(crate) token: SubscriberId,
    pub(crate) inner: RwLock<ComputedInner<T>>,
}

pub(crate) struct ComputedInner<T> {
    /// `None` until the first evaluation.
    pub(crate) value: Option<T>,
    pub(crate) compute: Arc<dyn Fn() -> T + Send + Sync>,
    pub(crate) write: Option<Arc<dyn Fn(T) + Send + Sync>>,
    pub(crate) is_valid: bool,
    pub(crate) has_evaluated: bool,
    pub(crate) is_disposed: bool,
    /// The exact set of refs read during the last evaluation.
    pub(crate) dependencies: DependencySet,
    /// One invalidation subscription per dependency ref.
    pub(crate) dependency_subs: Vec<(DependencyRef, SubscriptionHandle)>,
    pub(crate) subscribers: ChannelRegistry<T>,
    pub(crate) limiter: Option<RateLimit<T>>,
    pub(crate) pending: Option<PendingWrite<T>>,
    pub(crate) weak_self: Weak<ComputedState<T>>,
}

impl<T> Debug for ComputedInner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedInner").finish_non_exhaustive()
    }
}

impl<T> ComputedState<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn any_source(&self) -> AnySource {
        let weak = self.inner.read().or_poisoned().weak_self.clone();
        AnySource(self.token.0, weak as Weak<dyn Source + Send + Sync>)
    }

    /// Runs one evaluation: marks the dependency subscriptions removed, fires
    /// `beforeValueChanged`, evaluates the callback inside a capture frame,
    /// then reconciles subscriptions to the exact set of refs read. Returns
    /// the previous and the fresh value; does not notify `valueChanged`.
    pub(crate) fn evaluate(&self) -> (Option<T>, T) {
        let (compute, old, mid_delay) = {
            let mut guard = self.inner.write().or_poisoned();
            let inner = &mut *guard;
            for (_, handle) in &inner.dependency_subs {
                handle.dispose();
            }
            inner.has_evaluated = true;
            (
                Arc::clone(&inner.compute),
                inner.value.clone(),
                inner.pending.is_some(),
            )
        };
        if let Some(old) = &old {
            if !mid_delay {
                self.dispatch(Channel::BeforeValueChanged, old);
            }
        }
        let (value, accessed) = tracker::capture_reads(|| compute());
        {
            let mut guard = self.inner.write().or_poisoned();
            let inner = &mut *guard;
            inner.value = Some(value.clone());
            if inner.is_disposed {
                // disposed from inside its own callback: leave no
                // subscriptions behind
                for (_, handle) in &inner.dependency_subs {
                    handle.dispose();
                }
                inner.dependency_subs.clear();
                inner.dependencies.clear();
            } else {
                self.reconcile(inner, accessed);
            }
            inner.is_valid = true;
        }
        (old, value)
    }

    /// Brings the dependency subscriptions in line with `accessed`: a marked
    /// subscription that is still read is revived in place (re-registered if
    /// a notify pass pruned it mid-evaluation), a newly-read ref gets a fresh
    /// invalidation subscription, and everything still marked is dropped.
    fn reconcile(&self, inner: &mut ComputedInner<T>, accessed: DependencySet) {
        for dependency in &accessed {
            if let Some((_, handle)) = inner
                .dependency_subs
                .iter()
                .find(|(d, _)| d == dependency)
            {
                if handle.reactivate() {
                    continue;
                }
            }
            let weak = inner.weak_self.clone();
            let callback: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
                if let Some(state) = weak.upgrade() {
                    state.invalidate();
                }
            });
            let handle = dependency.source.subscribe_invalidation(
                dependency.index,
                self.token,
                callback,
            );
            inner.dependency_subs.push((dependency.clone(), handle));
        }
        inner
            .dependency_subs
            .retain(|(_, handle)| !handle.is_disposed());
        inner.dependencies = accessed;
    }

    /// Evaluates and announces the fresh value, or defers the announcement to
    /// the debounce window when one is configured.
    pub(crate) fn recompute(&self) {
        let (old, value) = self.evaluate();
        let arm = {
            let mut guard = self.inner.write().or_poisoned();
            let inner = &mut *guard;
            match &inner.limiter {
                Some(limiter) => {
                    let window = limiter.window;
                    if inner.pending.is_none() {
                        let original = old.unwrap_or_else(|| value.clone());
                        inner.pending = Some(PendingWrite { original });
                    }
                    Some(window)
                }
                None => None,
            }
        };
        match arm {
            Some(window) => self.arm_timer(window),
            None => self.dispatch(Channel::ValueChanged, &value),
        }
    }

    /// A dependency changed. Eagerly recomputes (through the propagation
    /// queue, so deep chains unwind iteratively), or just restarts the
    /// debounce window when this cell is rate-limited.
    pub(crate) fn invalidate(&self) {
        enum Action {
            Recompute,
            Arm(Duration),
        }
        let action = {
            let mut guard = self.inner.write().or_poisoned();
            let inner = &mut *guard;
            if inner.is_disposed {
                None
            } else if !inner.is_valid {
                // another write inside the same burst restarts the window; an
                // eager recompute already in flight needs no second trigger
                match &inner.limiter {
                    Some(limiter) if inner.pending.is_some() => {
                        Some(Action::Arm(limiter.window))
                    }
                    _ => None,
                }
            } else {
                inner.is_valid = false;
                match &inner.limiter {
                    Some(limiter) => {
                        let window = limiter.window;
                        if inner.pending.is_none() {
                            if let Some(value) = &inner.value {
                                inner.pending = Some(PendingWrite {
                                    original: value.clone(),
                                });
                            }
                        }
                        Some(Action::Arm(window))
                    }
                    None => Some(Action::Recompute),
                }
            }
        };
        match action {
            Some(Action::Arm(window)) => self.arm_timer(window),
            Some(Action::Recompute) => {
                let Some(state) = self.inner.read().or_poisoned().weak_self.upgrade()
                else {
                    return;
                };
                dispatch::run_or_enqueue(Box::new(move || {
                    let stale = {
                        let inner = state.inner.read().or_poisoned();
                        !inner.is_valid && !inner.is_disposed
                    };
                    if stale {
                        state.recompute();
                    }
                }));
            }
            None => {}
        }
    }

    /// Announces `value` immediately, or defers to the debounce window.
    pub(crate) fn notify_value(&self, value: &T) {
        let arm = {
            let mut guard = self.inner.write().or_poisoned();
            let inner = &mut *guard;
            match &inner.limiter {
                Some(limiter) => {
                    let window = limiter.window;
                    if inner.pending.is_none() {
                        inner.pending = Some(PendingWrite {
                            original: value.clone(),
                        });
                    }
                    Some(window)
                }
                None => None,
            }
        };
        match arm {
            Some(window) => self.arm_timer(window),
            None => self.dispatch(Channel::ValueChanged, value),
        }
    }

    pub(crate) fn arm_timer(&self, window: Duration) {
        let (handle, generation) = {
            let inner = self.inner.read().or_poisoned();
            let Some(limiter) = &inner.limiter else { return };
            (limiter.timer.handle(), limiter.timer.next_generation())
        };
        let weak = self.inner.read().or_poisoned().weak_self.clone();
        rate_limit::spawn_fire(handle, generation, window, move || {
            if let Some(state) = weak.upgrade() {
                state.fire_pending(generation);
            }
        });
    }

    /// Debounce window elapsed: settle the evaluation, then announce the net
    /// change unless the value reverted to what the burst started from.
    fn fire_pending(&self, generation: u64) {
        let stale = {
            let inner = self.inner.read().or_poisoned();
            let current = inner
                .limiter
                .as_ref()
                .is_some_and(|l| l.timer.current() == generation);
            if !current {
                return;
            }
            !inner.is_valid && !inner.is_disposed
        };
        if stale {
            self.evaluate();
        }
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
            match &inner.value {
                Some(value) if !same(value, &pending.original) => Some(value.clone()),
                _ => None,
            }
        };
        if let Some(value) = payload {
            self.dispatch(Channel::ValueChanged, &value);
        }
    }

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
}

impl<T> Source for ComputedState<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscribe_invalidation(
        &self,
        _index: SubscribedIndex,
        token: SubscriberId,
        callback: Arc<dyn Fn() + Send + Sync>,
    ) -> SubscriptionHandle {
        if !self.inner.read().or_poisoned().has_evaluated {
            self.recompute();
        }
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
