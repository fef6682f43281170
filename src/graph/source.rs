//! Type-erased publisher handles.
//!
//! A computed cell holds its dependencies as [`DependencyRef`]s: a reference
//! to the publishing cell (or one index of a publishing sequence) that can
//! create an invalidation subscription without knowing the publisher's value
//! type.

use crate::subscription::{SubscriberId, SubscriptionHandle};
use core::{fmt::Debug, hash::Hash};
use std::sync::{Arc, Weak};

/// The dependency slot a subscription attaches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum SubscribedIndex {
    /// The whole value of a plain or computed cell.
    Cell,
    /// Any change to a sequence (the all-changes sentinel).
    All,
    /// One specific index of a sequence.
    At(usize),
}

/// Implemented by anything a computed cell can depend on.
pub(crate) trait Source: Send + Sync {
    /// Registers a subscription on the channel backing `index` whose callback
    /// invalidates the dependent computation.
    fn subscribe_invalidation(
        &self,
        index: SubscribedIndex,
        token: SubscriberId,
        callback: Arc<dyn Fn() + Send + Sync>,
    ) -> SubscriptionHandle;
}

/// A type-erased handle to a [`Source`].
///
/// Identity (equality, hashing) is by the publisher's id, so two handles to
/// the same cell compare equal regardless of how they were obtained.
#[derive(Clone)]
pub(crate) struct AnySource(
    pub(crate) usize,
    pub(crate) Weak<dyn Source + Send + Sync>,
);

impl Debug for AnySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AnySource").field(&self.0).finish()
    }
}

impl Hash for AnySource {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialEq for AnySource {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for AnySource {}

impl Source for AnySource {
    fn subscribe_invalidation(
        &self,
        index: SubscribedIndex,
        token: SubscriberId,
        callback: Arc<dyn Fn() + Send + Sync>,
    ) -> SubscriptionHandle {
        match self.1.upgrade() {
            Some(inner) => inner.subscribe_invalidation(index, token, callback),
            None => SubscriptionHandle::disposed(),
        }
    }
}

/// Identifies either a whole cell or one index of a sequence as a
/// recomputation dependency. Equality is by (publisher id, index).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct DependencyRef {
    pub(crate) source: AnySource,
    pub(crate) index: SubscribedIndex,
}
