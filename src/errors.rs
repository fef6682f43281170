//! Error types for fallible cell and sequence operations.

use thiserror::Error;

/// Errors returned by the fallible (`try_`) variants of cell and sequence
/// operations. The panicking variants unwrap these with the same messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    /// A write was attempted on a computed cell that was constructed without
    /// a write callback.
    #[error("cannot write to a read-only computed cell")]
    ReadOnly,

    /// A structurally invalid argument, such as a zero-length debounce window
    /// or an inverted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The operation has no defined change-notification semantics and is
    /// deliberately unsupported.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}
