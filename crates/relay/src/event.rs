#![forbid(unsafe_code)]

//! Publisher and subscriber facades over one channel.
//!
//! [`Event<A>`] owns the channel and is the only type with
//! [`dispatch`](Event::dispatch). [`Subscriber<A>`] is the view handed to
//! everyone else: it carries the same registration surface through
//! [`Subscribe`] but cannot trigger listeners.
//!
//! ```compile_fail
//! use relay::Event;
//!
//! let event = Event::<(u32,)>::new();
//! let view = event.subscriber();
//! view.dispatch((1,)); // subscribers cannot dispatch
//! ```

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::binding::Binding;
use crate::channel::ChannelCore;
use crate::config::ChannelConfig;
use crate::error::DispatchError;
use crate::listener::Listener;
use crate::observer::ListenerKind;

/// Registration surface shared by [`Event`] and [`Subscriber`].
///
/// Every `*_with` method takes an explicit `allow_duplicates`; the short
/// forms reject duplicates. Listeners are matched by identity, so keep a
/// clone of a [`Listener`] to remove it later.
pub trait Subscribe<A> {
    /// Live persistent listeners.
    fn listener_count(&self) -> usize;

    /// Live one-time listeners; all of them are retired by the next dispatch.
    fn one_time_listener_count(&self) -> usize;

    /// Is `listener` registered as a persistent listener?
    /// One-time listeners are not considered.
    fn contains(&self, listener: &Listener<A>) -> bool;

    /// Is `listener` registered as a one-time listener?
    fn contains_once(&self, listener: &Listener<A>) -> bool;

    fn add_listener_with(&self, listener: Listener<A>, allow_duplicates: bool) -> bool;

    /// Add a persistent listener. Returns `false` if it is already present.
    fn add_listener(&self, listener: Listener<A>) -> bool {
        self.add_listener_with(listener, false)
    }

    fn bind_listener_with(&self, listener: Listener<A>, allow_duplicates: bool)
    -> Option<Binding<A>>;

    /// Add a persistent listener and return a [`Binding`] that can toggle
    /// it. `None` if the add was rejected.
    fn bind_listener(&self, listener: Listener<A>) -> Option<Binding<A>> {
        self.bind_listener_with(listener, false)
    }

    fn add_once_with(&self, listener: Listener<A>, allow_duplicates: bool) -> bool;

    /// Add a listener that is removed after the next dispatch fires it.
    fn add_once(&self, listener: Listener<A>) -> bool {
        self.add_once_with(listener, false)
    }

    fn remove_listener(&self, listener: &Listener<A>) -> bool;

    fn remove_once(&self, listener: &Listener<A>) -> bool;

    /// Remove the selected kinds of listeners.
    ///
    /// Clearing persistent listeners from inside a persistent listener while
    /// a dispatch is running makes that dispatch fail with
    /// [`DispatchError::ListenersVanished`].
    fn remove_all_with(&self, persistent: bool, one_time: bool);

    fn remove_all(&self) {
        self.remove_all_with(true, true);
    }
}

/// Implements [`Subscribe`] in terms of `self.channel()`.
macro_rules! impl_subscribe {
    ($ty:ident) => {
        impl<A: 'static> Subscribe<A> for $ty<A> {
            fn listener_count(&self) -> usize {
                self.channel()
                    .map_or(0, |c| ChannelCore::len(&c, ListenerKind::Persistent))
            }

            fn one_time_listener_count(&self) -> usize {
                self.channel()
                    .map_or(0, |c| ChannelCore::len(&c, ListenerKind::OneTime))
            }

            fn contains(&self, listener: &Listener<A>) -> bool {
                self.channel().is_some_and(|c| {
                    ChannelCore::contains(&c, ListenerKind::Persistent, listener)
                })
            }

            fn contains_once(&self, listener: &Listener<A>) -> bool {
                self.channel()
                    .is_some_and(|c| ChannelCore::contains(&c, ListenerKind::OneTime, listener))
            }

            fn add_listener_with(&self, listener: Listener<A>, allow_duplicates: bool) -> bool {
                self.channel().is_some_and(|c| {
                    ChannelCore::add(&c, ListenerKind::Persistent, listener, allow_duplicates)
                })
            }

            fn bind_listener_with(
                &self,
                listener: Listener<A>,
                allow_duplicates: bool,
            ) -> Option<Binding<A>> {
                let channel = self.channel()?;
                let added = ChannelCore::add(
                    &channel,
                    ListenerKind::Persistent,
                    listener.clone(),
                    allow_duplicates,
                );
                added.then(|| Binding::new(Rc::downgrade(&channel), listener, allow_duplicates))
            }

            fn add_once_with(&self, listener: Listener<A>, allow_duplicates: bool) -> bool {
                self.channel().is_some_and(|c| {
                    ChannelCore::add(&c, ListenerKind::OneTime, listener, allow_duplicates)
                })
            }

            fn remove_listener(&self, listener: &Listener<A>) -> bool {
                self.channel()
                    .is_some_and(|c| ChannelCore::remove(&c, ListenerKind::Persistent, listener))
            }

            fn remove_once(&self, listener: &Listener<A>) -> bool {
                self.channel()
                    .is_some_and(|c| ChannelCore::remove(&c, ListenerKind::OneTime, listener))
            }

            fn remove_all_with(&self, persistent: bool, one_time: bool) {
                if let Some(c) = self.channel() {
                    ChannelCore::remove_all(&c, persistent, one_time);
                }
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Event (publisher)
// ---------------------------------------------------------------------------

/// A channel and the right to dispatch on it.
///
/// `A` is the argument tuple: `()`, `(T0,)`, `(T0, T1)` and so on. The
/// `Event0`..`Event4` aliases spell the common arities.
///
/// Dropping the `Event` drops the channel: subscriber views and bindings
/// then report zero listeners and reject every change.
pub struct Event<A> {
    core: Rc<RefCell<ChannelCore<A>>>,
    view: OnceCell<Subscriber<A>>,
}

impl<A: 'static> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.core.try_borrow() {
            Ok(core) => f.debug_tuple("Event").field(&*core).finish(),
            Err(_) => f.debug_tuple("Event").field(&"<dispatching>").finish(),
        }
    }
}

impl<A: 'static> Event<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            core: Rc::new(RefCell::new(ChannelCore::new(config))),
            view: OnceCell::new(),
        }
    }

    /// The dispatch-free view of this channel.
    ///
    /// Created on first call; every later call returns the same view.
    pub fn subscriber(&self) -> &Subscriber<A> {
        self.view.get_or_init(|| Subscriber {
            core: Rc::downgrade(&self.core),
        })
    }

    /// Invoke every persistent listener, then every one-time listener, in
    /// the order they were added. One-time listeners are removed once they
    /// have fired.
    ///
    /// Listeners may add, remove and dispatch on this channel while they
    /// run. Anything added during a pass waits for the next dispatch.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::Listener`] if a listener fails; the listeners after
    ///   it in the same pass are not invoked.
    /// - [`DispatchError::ListenersVanished`] if persistent listeners were
    ///   cleared while this dispatch still had some to visit.
    pub fn dispatch(&self, args: A) -> Result<(), DispatchError> {
        ChannelCore::dispatch(&self.core, &args)
    }

    /// Name from the channel's configuration.
    #[must_use]
    pub fn name(&self) -> String {
        self.core.borrow().name().to_owned()
    }

    /// Slots allocated for persistent listeners.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.core.borrow().store(ListenerKind::Persistent).capacity()
    }

    /// Slots allocated for one-time listeners; 0 until the first `add_once`.
    #[must_use]
    pub fn one_time_capacity(&self) -> usize {
        self.core.borrow().store(ListenerKind::OneTime).capacity()
    }

    fn channel(&self) -> Option<Rc<RefCell<ChannelCore<A>>>> {
        Some(Rc::clone(&self.core))
    }
}

impl_subscribe!(Event);

// ---------------------------------------------------------------------------
// Subscriber (view)
// ---------------------------------------------------------------------------

/// Registration-only view of an [`Event`].
///
/// Holds a weak reference: it never keeps the channel alive, and once the
/// `Event` is dropped every operation is rejected.
pub struct Subscriber<A> {
    core: Weak<RefCell<ChannelCore<A>>>,
}

// Manual Clone: shares the same Weak, no `A: Clone` bound.
impl<A> Clone for Subscriber<A> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
        }
    }
}

impl<A> fmt::Debug for Subscriber<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl<A> Subscriber<A> {
    /// Whether the owning [`Event`] still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.core.strong_count() > 0
    }

    /// Whether both views refer to the same channel.
    #[must_use]
    pub fn same_channel(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.core, &other.core)
    }

    fn channel(&self) -> Option<Rc<RefCell<ChannelCore<A>>>> {
        self.core.upgrade()
    }
}

impl_subscribe!(Subscriber);

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<u32>>, Listener<()>) {
        let hits = Rc::new(Cell::new(0u32));
        let h = Rc::clone(&hits);
        (hits, Listener::new(move || h.set(h.get() + 1)))
    }

    #[test]
    fn subscriber_is_memoized() {
        let event = Event::<()>::new();
        let a = event.subscriber();
        let b = event.subscriber();
        assert!(std::ptr::eq(a, b));
        assert!(a.same_channel(&b.clone()));
    }

    #[test]
    fn subscriber_registers_publisher_dispatches() {
        let event = Event::<()>::new();
        let (hits, listener) = counter();
        assert!(event.subscriber().add_listener(listener.clone()));
        assert!(event.contains(&listener));
        assert_eq!(event.listener_count(), 1);

        event.dispatch(()).unwrap();
        assert_eq!(hits.get(), 1);

        assert!(event.subscriber().remove_listener(&listener));
        event.dispatch(()).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn subscriber_does_not_keep_channel_alive() {
        let event = Event::<()>::new();
        let view = event.subscriber().clone();
        assert!(view.is_alive());
        drop(event);
        assert!(!view.is_alive());

        let (_, listener) = counter();
        assert!(!view.add_listener(listener.clone()));
        assert!(!view.add_once(listener.clone()));
        assert!(view.bind_listener(listener.clone()).is_none());
        assert!(!view.contains(&listener));
        assert!(!view.remove_listener(&listener));
        assert_eq!(view.listener_count(), 0);
        view.remove_all();
    }

    #[test]
    fn capacities_follow_growth_policy() {
        let event = Event::<()>::new();
        assert_eq!(event.capacity(), 1);
        assert_eq!(event.one_time_capacity(), 0);

        event.add_once(Listener::new(|| {}));
        assert_eq!(event.one_time_capacity(), 1);

        for _ in 0..3 {
            event.add_listener(Listener::new(|| {}));
        }
        assert_eq!(event.capacity(), 4);
    }

    #[test]
    fn name_from_config() {
        let event = Event::<()>::with_config(ChannelConfig::new().with_name("resize"));
        assert_eq!(event.name(), "resize");
        assert_eq!(Event::<()>::default().name(), "event");
    }

    #[test]
    fn debug_format() {
        let event = Event::<()>::new();
        let dbg = format!("{event:?}");
        assert!(dbg.contains("Event"));
        assert!(dbg.contains("ChannelCore"));
        assert!(format!("{:?}", event.subscriber()).contains("alive: true"));
    }
}
