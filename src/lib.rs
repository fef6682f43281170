//! An observable-cell reactive engine.
//!
//! The engine is built from three primitives:
//! 1. **[`ObservableCell`](cell::ObservableCell)**: a boxed mutable value
//!    with named notification channels (`valueChanged`, `beforeValueChanged`,
//!    custom channels).
//! 2. **[`ComputedCell`](computed::ComputedCell)**: a value produced by a
//!    callback. Its dependencies are not declared; they are discovered by
//!    tracing which cells the callback reads, and its subscriptions are
//!    reconciled to that exact set on every evaluation.
//! 3. **[`ObservableSequence`](sequence::ObservableSequence)**: an ordered
//!    collection whose every mutation produces an index-addressed diff of
//!    add/remove entries, with subscriptions filterable down to one index.
//!
//! ```rust
//! use reactive_cells::prelude::*;
//!
//! let first = ObservableCell::new("Ada".to_string());
//! let last = ObservableCell::new("Lovelace".to_string());
//! let full = ComputedCell::new({
//!     let (first, last) = (first.clone(), last.clone());
//!     move || format!("{} {}", first.value(), last.value())
//! });
//! assert_eq!(full.value(), "Ada Lovelace");
//!
//! // updating a dependency recomputes and re-announces synchronously
//! last.set("Byron".to_string());
//! assert_eq!(full.value(), "Ada Byron");
//! ```
//!
//! ## Design principles and assumptions
//! - **Automatic, minimal dependency tracking.** Reads are captured at
//!   runtime by a thread-scoped capture stack, so a computed cell whose
//!   callback takes a conditional branch stops listening to the cells of the
//!   branch it no longer takes.
//! - **Eager, synchronous propagation.** Writing a cell recomputes and
//!   notifies its dependents before the write returns; there is no scheduler
//!   tick. Deep chains are flattened through an internal queue instead of
//!   recursing, so chain length does not grow the call stack.
//! - **Cooperative single-timeline model.** All state lives behind locks, so
//!   handles are `Send + Sync`, but the engine assumes callers serialize
//!   their writes. The only asynchronous element is the optional per-cell
//!   debounce timer, which coalesces bursts of changes — merging sequence
//!   diffs per index and swallowing bursts that revert to the starting value.

#![deny(missing_docs)]

pub mod cell;
pub mod channel;
pub mod computed;
pub mod errors;
pub mod graph;
mod rate_limit;
pub mod sequence;
pub mod subscription;

/// Re-exports the commonly used surface.
pub mod prelude {
    pub use crate::{
        cell::ObservableCell,
        channel::Channel,
        computed::ComputedCell,
        errors::CellError,
        graph::untrack,
        sequence::{ChangeKind, ObservableSequence, SequenceChange},
        subscription::{SubscriberId, SubscriptionHandle},
    };
}
