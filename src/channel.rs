//! Notification channel identifiers.
//!
//! Every cell owns an independent subscriber list per channel. The engine
//! dispatches on the three built-in channels; callers may define their own
//! with [`Channel::Custom`] and drive them through
//! [`notify_channel`](crate::cell::ObservableCell::notify_channel).

/// Identifies one named notification stream on a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Fired after a cell's value has changed (possibly debounced).
    ValueChanged,
    /// Fired with the old value just before a change is applied.
    BeforeValueChanged,
    /// Fired by sequences with the list of index-tagged change entries.
    ArrayChange,
    /// A caller-defined channel, compared by name.
    Custom(&'static str),
}
