#![forbid(unsafe_code)]

//! Shared channel state and the operations every facade delegates to.
//!
//! All operations take the `RefCell` rather than `&mut self`: each one
//! borrows the core for the shortest possible stretch, and releases it
//! before a listener runs, before a churn observer is told, and before a
//! removed listener is dropped. That is what lets listeners call back into
//! the same channel.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, trace};

use crate::config::ChannelConfig;
use crate::dispatch::{PassStack, Step};
use crate::error::DispatchError;
use crate::listener::Listener;
use crate::observer::{Churn, ChurnEvent, ChurnObserver, ListenerKind};
use crate::store::ListenerStore;

/// Deferred churn notification, delivered once the core is released.
struct Notice {
    observer: Rc<dyn ChurnObserver>,
    event: ChurnEvent,
}

impl Notice {
    fn deliver(self) {
        self.observer.on_churn(&self.event);
    }
}

/// Exclusive owner of a channel's listener state.
pub(crate) struct ChannelCore<A> {
    persistent: ListenerStore<Listener<A>>,
    one_time: ListenerStore<Listener<A>>,
    passes: PassStack,
    config: ChannelConfig,
}

impl<A> fmt::Debug for ChannelCore<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelCore")
            .field("name", &self.config.name)
            .field("persistent", &self.persistent)
            .field("one_time", &self.one_time)
            .field("active_passes", &self.passes.depth())
            .finish()
    }
}

impl<A: 'static> ChannelCore<A> {
    pub(crate) fn new(config: ChannelConfig) -> Self {
        Self {
            persistent: ListenerStore::persistent(),
            one_time: ListenerStore::one_time(),
            passes: PassStack::default(),
            config,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    pub(crate) fn store(&self, kind: ListenerKind) -> &ListenerStore<Listener<A>> {
        match kind {
            ListenerKind::Persistent => &self.persistent,
            ListenerKind::OneTime => &self.one_time,
        }
    }

    fn store_mut(&mut self, kind: ListenerKind) -> &mut ListenerStore<Listener<A>> {
        match kind {
            ListenerKind::Persistent => &mut self.persistent,
            ListenerKind::OneTime => &mut self.one_time,
        }
    }

    fn notice(&self, kind: ListenerKind, churn: Churn) -> Option<Notice> {
        let observer = self.config.observer.as_ref()?;
        Some(Notice {
            observer: Rc::clone(observer),
            event: ChurnEvent {
                channel: self.config.name.clone(),
                kind,
                churn,
                count: self.store(kind).len(),
            },
        })
    }

    /// Remove at `index`, keeping active passes aligned.
    fn remove_at(&mut self, kind: ListenerKind, index: usize) -> Option<Listener<A>> {
        let removed = self.store_mut(kind).remove_at(index)?;
        self.passes.on_removed(kind, index);
        Some(removed)
    }

    // ── Registration ──────────────────────────────────────────────────────

    pub(crate) fn contains(cell: &RefCell<Self>, kind: ListenerKind, listener: &Listener<A>) -> bool {
        cell.borrow().store(kind).contains(listener)
    }

    pub(crate) fn len(cell: &RefCell<Self>, kind: ListenerKind) -> usize {
        cell.borrow().store(kind).len()
    }

    pub(crate) fn add(
        cell: &RefCell<Self>,
        kind: ListenerKind,
        listener: Listener<A>,
        allow_duplicates: bool,
    ) -> bool {
        let notice = {
            let mut core = cell.borrow_mut();
            if !core.store_mut(kind).add(listener, allow_duplicates) {
                return false;
            }
            core.notice(kind, Churn::Added)
        };
        if let Some(notice) = notice {
            notice.deliver();
        }
        true
    }

    pub(crate) fn remove(cell: &RefCell<Self>, kind: ListenerKind, listener: &Listener<A>) -> bool {
        let (removed, notice) = {
            let mut core = cell.borrow_mut();
            let Some(index) = core.store(kind).position(listener) else {
                return false;
            };
            let removed = core.remove_at(kind, index);
            (removed, core.notice(kind, Churn::Removed))
        };
        if let Some(notice) = notice {
            notice.deliver();
        }
        removed.is_some()
    }

    pub(crate) fn remove_all(cell: &RefCell<Self>, persistent: bool, one_time: bool) {
        let mut dropped = Vec::new();
        let mut notices = Vec::new();
        {
            let mut core = cell.borrow_mut();
            for (kind, selected) in [
                (ListenerKind::Persistent, persistent),
                (ListenerKind::OneTime, one_time),
            ] {
                if !selected || core.store(kind).is_empty() {
                    continue;
                }
                let removed = core.store_mut(kind).clear();
                core.passes.on_cleared(kind);
                notices.extend(core.notice(kind, Churn::Cleared(removed.len())));
                dropped.extend(removed);
            }
        }
        for notice in notices {
            notice.deliver();
        }
        drop(dropped);
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    pub(crate) fn dispatch(cell: &RefCell<Self>, args: &A) -> Result<(), DispatchError> {
        {
            let core = cell.borrow();
            trace!(
                channel = core.name(),
                persistent = core.persistent.len(),
                one_time = core.one_time.len(),
                depth = core.passes.depth(),
                "dispatch"
            );
        }
        Self::run_pass(cell, ListenerKind::Persistent, args)?;
        Self::run_pass(cell, ListenerKind::OneTime, args)
    }

    fn run_pass(cell: &RefCell<Self>, kind: ListenerKind, args: &A) -> Result<(), DispatchError> {
        let depth = {
            let mut core = cell.borrow_mut();
            let len = core.store(kind).len();
            core.passes.begin(kind, len)
        };
        let _guard = PassGuard { cell, depth };

        loop {
            let step = {
                let mut core = cell.borrow_mut();
                let core = &mut *core;
                let store = match kind {
                    ListenerKind::Persistent => &core.persistent,
                    ListenerKind::OneTime => &core.one_time,
                };
                core.passes.step(depth, store)
            };
            let listener = match step {
                Ok(Step::Invoke(listener)) => listener,
                Ok(Step::Skip) => continue,
                Ok(Step::Done) => return Ok(()),
                Err(err) => {
                    if let DispatchError::ListenersVanished { expected, found } = err {
                        error!(
                            channel = cell.borrow().name(),
                            expected,
                            found,
                            "listener store cleared underneath an active dispatch"
                        );
                    }
                    return Err(err);
                }
            };

            if let Err(err) = listener.invoke(args) {
                debug!(
                    channel = cell.borrow().name(),
                    kind = kind.as_str(),
                    error = %err,
                    "listener failed; aborting pass"
                );
                return Err(DispatchError::Listener(err));
            }

            if kind == ListenerKind::OneTime {
                Self::retire(cell, depth, &listener);
            }
        }
    }

    /// Unsubscribe a one-time listener that just fired, unless it already
    /// removed itself.
    fn retire(cell: &RefCell<Self>, depth: usize, fired: &Listener<A>) {
        let (retired, notice) = {
            let mut core = cell.borrow_mut();
            let core = &mut *core;
            let Some(index) = core.passes.settle(depth, &core.one_time, fired) else {
                return;
            };
            let retired = core.remove_at(ListenerKind::OneTime, index);
            (retired, core.notice(ListenerKind::OneTime, Churn::Fired))
        };
        if let Some(notice) = notice {
            notice.deliver();
        }
        drop(retired);
    }
}

/// Closes a pass on every exit path, including listener errors and panics.
struct PassGuard<'a, A> {
    cell: &'a RefCell<ChannelCore<A>>,
    depth: usize,
}

impl<A> Drop for PassGuard<'_, A> {
    fn drop(&mut self) {
        // A panic while the core is borrowed leaves it borrowed; the outer
        // pass truncates past this depth anyway.
        if let Ok(mut core) = self.cell.try_borrow_mut() {
            core.passes.finish(self.depth);
        }
    }
}
