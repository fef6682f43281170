//! The capture and dispatch machinery that correlates cell reads with the
//! computation evaluating them and keeps notification passes safe to
//! re-enter.

pub(crate) mod dispatch;
pub(crate) mod source;
pub(crate) mod tracker;

pub use tracker::untrack;
