//! Subscriptions: the handles binding a publishing cell, a channel, a
//! callback, and an opaque subscriber token.
//!
//! Subscriber lists are plain `Vec`s rather than maps, on the assumption that
//! per-channel fan-out is small and that registration order must be preserved
//! for dispatch (subscribers are notified in the order they subscribed).

use crate::{channel::Channel, graph::dispatch};
use rustc_hash::FxHashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn next_id() -> usize {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// An opaque subscriber identity.
///
/// The engine never dereferences a token; it only compares ids, for cycle
/// suppression during dispatch and for subscription pruning. Cells carry
/// their own token (see `subscriber_id` on the cell types); callers that are
/// not cells mint one with [`SubscriberId::unique`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub(crate) usize);

impl SubscriberId {
    /// Mints a fresh token, distinct from every cell and every other token.
    pub fn unique() -> Self {
        Self(next_id())
    }
}

/// Publisher-side subscription entry for a channel carrying payload `P`.
pub(crate) struct Subscription<P: ?Sized> {
    pub(crate) token: SubscriberId,
    pub(crate) callback: Arc<dyn Fn(&P) + Send + Sync>,
    pub(crate) removed: Arc<AtomicBool>,
    pub(crate) pruned: Arc<AtomicBool>,
}

impl<P: ?Sized> Clone for Subscription<P> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            callback: Arc::clone(&self.callback),
            removed: Arc::clone(&self.removed),
            pruned: Arc::clone(&self.pruned),
        }
    }
}

impl<P: ?Sized> Subscription<P> {
    pub(crate) fn new(
        token: SubscriberId,
        callback: Arc<dyn Fn(&P) + Send + Sync>,
    ) -> (Self, SubscriptionHandle) {
        let sub = Self {
            token,
            callback,
            removed: Arc::new(AtomicBool::new(false)),
            pruned: Arc::new(AtomicBool::new(false)),
        };
        let handle = SubscriptionHandle {
            removed: Arc::clone(&sub.removed),
            pruned: Arc::clone(&sub.pruned),
        };
        (sub, handle)
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }
}

/// Caller-side handle to a registered subscription.
///
/// Disposal marks the entry removed; the publisher physically drops it after
/// its next completed notify pass over that channel.
#[derive(Clone, Debug)]
pub struct SubscriptionHandle {
    removed: Arc<AtomicBool>,
    pruned: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    /// A handle that is already dead, returned when registration is
    /// impossible (the publisher has been dropped).
    pub(crate) fn disposed() -> Self {
        Self {
            removed: Arc::new(AtomicBool::new(true)),
            pruned: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Marks the subscription removed. The callback will not fire again.
    pub fn dispose(&self) {
        self.removed.store(true, Ordering::Release);
    }

    /// Whether the subscription has been marked removed.
    pub fn is_disposed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Clears the removed mark, reviving the subscription in place.
    ///
    /// Fails when the publisher has already physically dropped the entry
    /// (pruned during a notify pass while it was marked removed); the caller
    /// must register a fresh subscription instead.
    pub(crate) fn reactivate(&self) -> bool {
        if self.pruned.load(Ordering::Acquire) {
            return false;
        }
        self.removed.store(false, Ordering::Release);
        if self.pruned.load(Ordering::Acquire) {
            self.removed.store(true, Ordering::Release);
            return false;
        }
        true
    }
}

/// Registration-ordered subscriber list for one channel.
pub(crate) struct SubscriberList<P: ?Sized>(Vec<Subscription<P>>);

impl<P: ?Sized> Default for SubscriberList<P> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<P: ?Sized> SubscriberList<P> {
    pub(crate) fn push(&mut self, sub: Subscription<P>) {
        self.0.push(sub);
    }

    /// Clones the entry at `index`, if any. Dispatch walks the list by index
    /// so that entries registered during the pass are still visited.
    pub(crate) fn get(&self, index: usize) -> Option<Subscription<P>> {
        self.0.get(index).cloned()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.0.iter().filter(|s| !s.is_removed()).count()
    }

    /// Physically drops removed entries, flagging each as pruned so a stale
    /// handle cannot revive it.
    pub(crate) fn prune(&mut self) {
        self.0.retain(|s| {
            if s.is_removed() {
                s.pruned.store(true, Ordering::Release);
                false
            } else {
                true
            }
        });
    }
}

/// Per-cell map of channel to subscriber list.
pub(crate) struct ChannelRegistry<P: ?Sized>(FxHashMap<Channel, SubscriberList<P>>);

impl<P: ?Sized> Default for ChannelRegistry<P> {
    fn default() -> Self {
        Self(FxHashMap::default())
    }
}

impl<P: ?Sized> ChannelRegistry<P> {
    pub(crate) fn register(&mut self, channel: Channel, sub: Subscription<P>) {
        self.0.entry(channel).or_default().push(sub);
    }

    pub(crate) fn get_at(&self, channel: Channel, index: usize) -> Option<Subscription<P>> {
        self.0.get(&channel)?.get(index)
    }

    pub(crate) fn live_total(&self) -> usize {
        self.0.values().map(SubscriberList::live_count).sum()
    }

    pub(crate) fn has_live(&self, channel: Channel) -> bool {
        self.0
            .get(&channel)
            .is_some_and(|list| list.live_count() > 0)
    }

    pub(crate) fn prune(&mut self, channel: Channel) {
        if let Some(list) = self.0.get_mut(&channel) {
            list.prune();
        }
    }
}

/// Walks one channel's subscribers for a single notify pass.
///
/// The caller supplies `fetch` to look an entry up by position under its own
/// lock (the lock must not be held across the callback invocations this
/// makes) and `prune` to drop removed entries once the walk completes.
/// `deliver` is an extra positional predicate, used by sequences for
/// index-filtered delivery. Walking by position means entries registered
/// during the pass are still visited.
///
/// A pass is skipped entirely when `owner` is already mid-notification on
/// `channel` (reentrancy guard). Within a pass, an entry is skipped when it
/// is removed, when its token is itself mid-notification on this channel, or
/// when its token has already been notified earlier in this pass (cycle
/// suppression); every fired token is recorded into all enclosing passes.
pub(crate) fn run_notify_pass<P: ?Sized>(
    owner: SubscriberId,
    channel: Channel,
    payload: &P,
    fetch: impl Fn(usize) -> Option<Subscription<P>>,
    deliver: impl Fn(usize) -> bool,
    prune: impl FnOnce(),
) {
    let Some(_notifying) = dispatch::enter(owner, channel) else {
        return;
    };
    let _pass = dispatch::begin_pass();
    let mut index = 0;
    while let Some(sub) = fetch(index) {
        let position = index;
        index += 1;
        if sub.is_removed()
            || dispatch::is_notifying(sub.token, channel)
            || dispatch::already_notified(sub.token)
            || !deliver(position)
        {
            continue;
        }
        dispatch::record_notified(sub.token);
        (sub.callback)(payload);
    }
    prune();
}
