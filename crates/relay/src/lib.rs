#![forbid(unsafe_code)]

//! Typed, single-threaded, multi-listener events.
//!
//! A publisher owns an [`Event<A>`]; consumers register [`Listener`]s through
//! the channel's [`Subscriber`] view; the publisher calls
//! [`Event::dispatch`] to invoke them all in one pass.
//!
//! - [`Event`]: owns the channel and is the only handle that can dispatch.
//! - [`Subscriber`]: dispatch-free view, created once per channel.
//! - [`Binding`]: toggles one persistent listener on and off.
//! - [`ChurnObserver`]: optional hook told about every add and remove.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use relay::prelude::*;
//!
//! let resized: Event2<u16, u16> = Event::new();
//! let area = Rc::new(Cell::new(0u32));
//!
//! let sink = Rc::clone(&area);
//! let on_resize: Listener<(u16, u16)> = Listener::new(move |w: &u16, h: &u16| {
//!     sink.set(u32::from(*w) * u32::from(*h));
//! });
//! resized.subscriber().add_listener(on_resize.clone());
//!
//! resized.dispatch((80, 24)).unwrap();
//! assert_eq!(area.get(), 1920);
//!
//! resized.subscriber().remove_listener(&on_resize);
//! assert_eq!(resized.listener_count(), 0);
//! ```
//!
//! # Invariants
//!
//! 1. Listeners fire in the order they were added; persistent listeners
//!    before one-time listeners.
//! 2. A listener added during a dispatch is first invoked by the next one.
//! 3. A listener removed during a dispatch is never invoked after its
//!    removal, and no other listener is skipped or invoked twice because of
//!    it.
//! 4. Every one-time listener present when its pass starts fires at most
//!    once and is gone when the pass ends.
//! 5. Listener errors abort the current pass and are returned by
//!    `dispatch`; nothing already done is rolled back.
//!
//! # Threading
//!
//! Channels are `!Send` and `!Sync`. Reentrancy from a listener into the
//! same channel is supported; parallel access is not.

pub mod binding;
mod channel;
pub mod config;
mod dispatch;
pub mod error;
pub mod event;
pub mod listener;
pub mod observer;
pub mod store;

pub use binding::Binding;
pub use config::ChannelConfig;
pub use error::{DispatchError, ListenerError};
pub use event::{Event, Subscribe, Subscriber};
pub use listener::{Callback, Listener, ListenerResult};
pub use observer::{Churn, ChurnEvent, ChurnObserver, ListenerKind, TracingObserver};
pub use store::ListenerStore;

/// Channel without arguments.
pub type Event0 = Event<()>;
/// Channel carrying one argument.
pub type Event1<T0> = Event<(T0,)>;
pub type Event2<T0, T1> = Event<(T0, T1)>;
pub type Event3<T0, T1, T2> = Event<(T0, T1, T2)>;
pub type Event4<T0, T1, T2, T3> = Event<(T0, T1, T2, T3)>;

pub type Subscriber0 = Subscriber<()>;
pub type Subscriber1<T0> = Subscriber<(T0,)>;
pub type Subscriber2<T0, T1> = Subscriber<(T0, T1)>;
pub type Subscriber3<T0, T1, T2> = Subscriber<(T0, T1, T2)>;
pub type Subscriber4<T0, T1, T2, T3> = Subscriber<(T0, T1, T2, T3)>;

pub mod prelude {
    //! Everything needed to publish and subscribe.

    pub use crate::{
        Binding, ChannelConfig, DispatchError, Event, Event0, Event1, Event2, Event3, Event4,
        Listener, ListenerError, Subscribe, Subscriber,
    };
}
