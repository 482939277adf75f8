#![forbid(unsafe_code)]

//! Toggle handle for one persistent listener.
//!
//! A [`Binding`] remembers what *it* last did to the channel. If the same
//! listener is removed some other way (`remove_listener`, `remove_all`), the
//! binding keeps reporting `enabled() == true` and `enable(true)` stays a
//! no-op. The next `enable(false)` finds nothing to remove: it returns
//! `false` and resets the binding to disabled, so a following `enable(true)`
//! re-adds the listener.

use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use crate::channel::ChannelCore;
use crate::listener::Listener;
use crate::observer::ListenerKind;

/// Pairs one listener with one channel; created by
/// [`Subscribe::bind_listener`](crate::Subscribe::bind_listener).
pub struct Binding<A> {
    channel: Weak<RefCell<ChannelCore<A>>>,
    listener: Listener<A>,
    allow_duplicates: bool,
    enabled: bool,
}

impl<A> fmt::Debug for Binding<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("listener", &self.listener)
            .field("allow_duplicates", &self.allow_duplicates)
            .field("enabled", &self.enabled)
            .field("bound", &(self.channel.strong_count() > 0))
            .finish()
    }
}

impl<A: 'static> Binding<A> {
    /// A binding whose listener has just been added.
    pub(crate) fn new(
        channel: Weak<RefCell<ChannelCore<A>>>,
        listener: Listener<A>,
        allow_duplicates: bool,
    ) -> Self {
        Self {
            channel,
            listener,
            allow_duplicates,
            enabled: true,
        }
    }

    /// Subscribe (`true`) or unsubscribe (`false`) the listener.
    ///
    /// Returns `true` only if the channel actually changed. Asking for the
    /// state the binding is already in, a rejected duplicate, or a channel
    /// that no longer exists return `false` and leave the binding as is. A
    /// disable that finds the listener already gone returns `false` but
    /// marks the binding disabled.
    pub fn enable(&mut self, enable: bool) -> bool {
        if enable == self.enabled {
            return false;
        }
        let Some(channel) = self.channel.upgrade() else {
            return false;
        };
        if enable {
            let added = ChannelCore::add(
                &channel,
                ListenerKind::Persistent,
                self.listener.clone(),
                self.allow_duplicates,
            );
            self.enabled = added;
            return added;
        }
        // Removed elsewhere: nothing to do, but stop claiming to be enabled.
        let removed = ChannelCore::remove(&channel, ListenerKind::Persistent, &self.listener);
        self.enabled = false;
        removed
    }

    /// What this binding last did: `true` after a successful enable.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    /// Whether re-enabling may add the listener when it is already present
    /// through another path.
    pub fn set_allow_duplicates(&mut self, allow: bool) {
        self.allow_duplicates = allow;
    }

    /// Persistent listener count of the bound channel, 0 if it is gone.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.channel
            .upgrade()
            .map_or(0, |channel| ChannelCore::len(&channel, ListenerKind::Persistent))
    }

    #[must_use]
    pub fn listener(&self) -> &Listener<A> {
        &self.listener
    }

    /// Whether the channel still exists.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.channel.strong_count() > 0
    }
}
