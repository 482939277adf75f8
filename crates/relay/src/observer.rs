#![forbid(unsafe_code)]

//! Passive listener-churn notifications.
//!
//! A [`ChurnObserver`] is told about every listener added to or removed from
//! a channel. Observers are diagnostics only: they run after the channel has
//! released its internal state, and nothing they do feeds back into
//! dispatch.

use std::borrow::Cow;
use std::fmt;

use tracing::debug;

/// Which of a channel's two stores an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Stays registered until removed.
    Persistent,
    /// Removed automatically after firing once.
    OneTime,
}

impl ListenerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Persistent => "persistent",
            Self::OneTime => "one_time",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Churn {
    Added,
    Removed,
    /// A one-time listener was unsubscribed after it fired.
    Fired,
    /// `remove_all` dropped this many listeners at once.
    Cleared(usize),
}

/// One churn notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChurnEvent {
    /// Name from the channel's [`ChannelConfig`](crate::ChannelConfig).
    pub channel: Cow<'static, str>,
    pub kind: ListenerKind,
    pub churn: Churn,
    /// Live listeners of `kind` after the change.
    pub count: usize,
}

/// Receives churn notifications from a channel.
pub trait ChurnObserver {
    fn on_churn(&self, event: &ChurnEvent);
}

impl<F> ChurnObserver for F
where
    F: Fn(&ChurnEvent),
{
    fn on_churn(&self, event: &ChurnEvent) {
        self(event);
    }
}

/// Logs every churn event at `DEBUG` through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ChurnObserver for TracingObserver {
    fn on_churn(&self, event: &ChurnEvent) {
        match event.churn {
            Churn::Cleared(removed) => debug!(
                channel = %event.channel,
                kind = event.kind.as_str(),
                removed,
                count = event.count,
                "listeners cleared"
            ),
            Churn::Added => debug!(
                channel = %event.channel,
                kind = event.kind.as_str(),
                count = event.count,
                "listener added"
            ),
            Churn::Removed => debug!(
                channel = %event.channel,
                kind = event.kind.as_str(),
                count = event.count,
                "listener removed"
            ),
            Churn::Fired => debug!(
                channel = %event.channel,
                kind = event.kind.as_str(),
                count = event.count,
                "one-time listener retired"
            ),
        }
    }
}
