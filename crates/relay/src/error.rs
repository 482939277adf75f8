#![forbid(unsafe_code)]

//! Error types for listeners and dispatch.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Listener failure | A fallible listener returned `Err` | Pass aborts, `DispatchError::Listener` |
//! | Listeners vanished | `remove_all` during an active persistent pass | Pass aborts, `DispatchError::ListenersVanished` |
//! | Duplicate add | Listener already present, duplicates disallowed | `false`, not an error |
//! | Absent remove | Listener not registered | `false`, not an error |

use std::fmt;

/// Boxed cause attached to a [`ListenerError`].
pub type BoxedSource = Box<dyn std::error::Error + 'static>;

/// Error returned by a fallible listener.
///
/// Raising one aborts the dispatch pass that invoked the listener.
#[derive(Debug)]
pub struct ListenerError {
    message: String,
    source: Option<BoxedSource>,
}

impl ListenerError {
    /// Create an error carrying only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error; its `Display` output becomes the message.
    #[must_use]
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener failed: {}", self.message)
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref()
    }
}

/// Errors surfaced by [`Event::dispatch`](crate::Event::dispatch).
#[derive(Debug)]
pub enum DispatchError {
    /// The persistent store shrank below what the active pass still had to
    /// visit. Single-entry removal never does this; a bulk `remove_all`
    /// from inside a listener does. This is caller misuse.
    ListenersVanished {
        /// Entries the pass still expected to exist.
        expected: usize,
        /// Live entries actually present.
        found: usize,
    },
    /// A listener returned an error; the rest of the pass was skipped.
    Listener(ListenerError),
}

impl DispatchError {
    /// Whether this error reports misuse of the channel rather than a
    /// listener failure.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::ListenersVanished { .. })
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListenersVanished { expected, found } => write!(
                f,
                "fewer listeners than expected ({found} < {expected}); \
                 remove_all must not be called from a persistent listener during dispatch"
            ),
            Self::Listener(err) => write!(f, "dispatch aborted: {err}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ListenersVanished { .. } => None,
            Self::Listener(err) => Some(err),
        }
    }
}

impl From<ListenerError> for DispatchError {
    fn from(err: ListenerError) -> Self {
        Self::Listener(err)
    }
}
