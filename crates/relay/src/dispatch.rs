#![forbid(unsafe_code)]

//! Reentrancy-safe walk over a [`ListenerStore`].
//!
//! # Design
//!
//! Each dispatch pass pushes a [`PassCursor`] onto the channel's
//! [`PassStack`]. The cursor covers the listeners present when the pass
//! began: `next` is the slot to visit, `end` is one past the last slot the
//! pass owns. Every `remove_at` on a store is reported to all cursors
//! walking that store, which shift themselves so that the slot they point at
//! still holds the same listener.
//!
//! Listeners are visited in insertion order. The channel state is never
//! borrowed while a listener runs; the cursor is consulted between calls.
//!
//! # Invariants
//!
//! 1. Listeners appended during a pass land at or beyond `end` and are not
//!    visited by that pass.
//! 2. Removing any entry, including the running listener, neither skips a
//!    remaining entry nor repeats a visited one.
//! 3. A one-time listener is retired only if it still sits in the slot it
//!    fired from (after shifting); if it removed itself nothing else is
//!    retired in its place.
//! 4. Clearing the persistent store while a persistent pass still has
//!    entries to visit is reported as [`DispatchError::ListenersVanished`].
//!
//! ```text
//! pass over [A, B, C], B removes A while running:
//!
//!   before B      next=2 end=3 current=1     [A, B, C]
//!   remove_at(0)  next=1 end=2 current=0     [B, C]
//!   next step     visits slot 1 == C
//! ```

use crate::error::DispatchError;
use crate::observer::ListenerKind;
use crate::store::ListenerStore;

/// Position of one active pass over one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PassCursor {
    kind: ListenerKind,
    next: usize,
    end: usize,
    /// Slot of the listener currently running, `None` once it is gone.
    current: Option<usize>,
    /// Set when the store was cleared with entries still unvisited.
    vanished: Option<usize>,
}

impl PassCursor {
    fn new(kind: ListenerKind, len: usize) -> Self {
        Self {
            kind,
            next: 0,
            end: len,
            current: None,
            vanished: None,
        }
    }

    fn on_removed(&mut self, index: usize) {
        if index < self.next {
            self.next -= 1;
        }
        if index < self.end {
            self.end -= 1;
        }
        self.current = match self.current {
            Some(c) if c == index => None,
            Some(c) if index < c => Some(c - 1),
            other => other,
        };
    }

    fn on_cleared(&mut self) {
        if self.kind == ListenerKind::Persistent && self.next < self.end {
            self.vanished = Some(self.end - self.next);
        }
        self.next = 0;
        self.end = 0;
        self.current = None;
    }
}

/// What the pass should do next.
#[derive(Debug)]
pub(crate) enum Step<L> {
    /// Invoke this listener; the borrow on the store has been released.
    Invoke(L),
    /// The slot was empty.
    Skip,
    Done,
}

/// Active passes of one channel, innermost last.
///
/// Nested dispatches finish before the pass that triggered them resumes, so
/// a pass is identified by its depth in the stack.
#[derive(Debug, Default)]
pub(crate) struct PassStack {
    passes: Vec<PassCursor>,
}

impl PassStack {
    /// Open a pass over a store holding `len` listeners; returns its depth.
    pub(crate) fn begin(&mut self, kind: ListenerKind, len: usize) -> usize {
        self.passes.push(PassCursor::new(kind, len));
        self.passes.len() - 1
    }

    /// Close the pass at `depth` and anything nested inside it.
    pub(crate) fn finish(&mut self, depth: usize) {
        self.passes.truncate(depth);
    }

    #[must_use]
    pub(crate) fn depth(&self) -> usize {
        self.passes.len()
    }

    /// Report `remove_at(index)` on the `kind` store.
    pub(crate) fn on_removed(&mut self, kind: ListenerKind, index: usize) {
        for pass in self.passes.iter_mut().filter(|p| p.kind == kind) {
            pass.on_removed(index);
        }
    }

    /// Report a bulk clear of the `kind` store.
    pub(crate) fn on_cleared(&mut self, kind: ListenerKind) {
        for pass in self.passes.iter_mut().filter(|p| p.kind == kind) {
            pass.on_cleared();
        }
    }

    /// Advance the pass at `depth` over `store`.
    pub(crate) fn step<L: Clone>(
        &mut self,
        depth: usize,
        store: &ListenerStore<L>,
    ) -> Result<Step<L>, DispatchError> {
        let Some(pass) = self.passes.get_mut(depth) else {
            return Ok(Step::Done);
        };
        if let Some(expected) = pass.vanished.take() {
            return Err(DispatchError::ListenersVanished {
                expected,
                found: store.len(),
            });
        }
        if pass.next >= pass.end {
            return Ok(Step::Done);
        }
        if store.len() < pass.end {
            return Err(DispatchError::ListenersVanished {
                expected: pass.end,
                found: store.len(),
            });
        }
        let index = pass.next;
        pass.next += 1;
        match store.get(index) {
            Some(listener) => {
                pass.current = Some(index);
                Ok(Step::Invoke(listener.clone()))
            }
            None => {
                pass.current = None;
                Ok(Step::Skip)
            }
        }
    }

    /// After a one-time listener returns: the slot to retire it from, if it
    /// is still where it fired.
    pub(crate) fn settle<L: PartialEq>(
        &mut self,
        depth: usize,
        store: &ListenerStore<L>,
        fired: &L,
    ) -> Option<usize> {
        let pass = self.passes.get_mut(depth)?;
        pass.current
            .take()
            .filter(|&index| store.get(index) == Some(fired))
    }
}
