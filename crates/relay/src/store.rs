#![forbid(unsafe_code)]

//! Growable, order-preserving listener storage.
//!
//! # Invariants
//!
//! 1. `len() <= capacity()`.
//! 2. Slots `[0, len())` hold listeners in insertion order.
//! 3. Slots `[len(), capacity())` are cleared; nothing stale is retained.
//! 4. Capacity doubles when an insert finds the store full (0 grows to 1).
//!
//! ```text
//! add(D) with len == capacity == 3
//! ┌───┬───┬───┐        ┌───┬───┬───┬───┬───┬───┐
//! │ A │ B │ C │   ──►  │ A │ B │ C │ D │ · │ · │
//! └───┴───┴───┘        └───┴───┴───┴───┴───┴───┘
//!
//! remove_at(1)
//! ┌───┬───┬───┬───┬───┬───┐        ┌───┬───┬───┬───┬───┬───┐
//! │ A │ B │ C │ D │ · │ · │   ──►  │ A │ C │ D │ · │ · │ · │
//! └───┴───┴───┴───┴───┴───┘        └───┴───┴───┴───┴───┴───┘
//! ```

use std::fmt;

/// Ordered slot storage for listeners.
pub struct ListenerStore<L> {
    /// `slots.len()` is the capacity.
    slots: Vec<Option<L>>,
    count: usize,
}

impl<L> ListenerStore<L> {
    /// Create an empty store with the given initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, count: 0 }
    }

    /// Store for persistent listeners: one slot up front.
    #[must_use]
    pub fn persistent() -> Self {
        Self::with_capacity(1)
    }

    /// Store for one-time listeners: nothing allocated until first add.
    #[must_use]
    pub fn one_time() -> Self {
        Self::with_capacity(0)
    }

    /// Number of live listeners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of slots currently allocated.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Listener at `index`, if that slot is live.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&L> {
        if index < self.count {
            self.slots[index].as_ref()
        } else {
            None
        }
    }

    /// Live listeners in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.slots[..self.count].iter().flatten()
    }

    /// Append without a duplicate check, growing if full.
    fn push(&mut self, listener: L) {
        if self.count == self.slots.len() {
            let grown = if self.slots.is_empty() {
                1
            } else {
                self.slots.len() * 2
            };
            self.slots.resize_with(grown, || None);
        }
        self.slots[self.count] = Some(listener);
        self.count += 1;
    }

    /// Remove the entry at `index`, shifting later entries down by one.
    ///
    /// Returns the removed listener, or `None` if `index` is out of range.
    pub fn remove_at(&mut self, index: usize) -> Option<L> {
        if index >= self.count {
            return None;
        }
        let removed = self.slots[index].take();
        // The emptied slot travels to the tail.
        self.slots[index..self.count].rotate_left(1);
        self.count -= 1;
        removed
    }

    /// Empty every slot. Capacity is kept.
    ///
    /// The removed listeners are handed back so the caller decides where
    /// they are dropped.
    pub fn clear(&mut self) -> Vec<L> {
        let removed = self.slots.iter_mut().filter_map(Option::take).collect();
        self.count = 0;
        removed
    }
}

impl<L: PartialEq> ListenerStore<L> {
    /// Index of the first live entry equal to `listener`.
    #[must_use]
    pub fn position(&self, listener: &L) -> Option<usize> {
        self.slots[..self.count]
            .iter()
            .position(|slot| slot.as_ref() == Some(listener))
    }

    #[must_use]
    pub fn contains(&self, listener: &L) -> bool {
        self.position(listener).is_some()
    }

    /// Append `listener`.
    ///
    /// Returns `false` without mutating when `allow_duplicates` is off and
    /// the listener is already present.
    pub fn add(&mut self, listener: L, allow_duplicates: bool) -> bool {
        if !allow_duplicates && self.contains(&listener) {
            return false;
        }
        self.push(listener);
        true
    }

    /// Remove the first entry equal to `listener`.
    pub fn remove_value(&mut self, listener: &L) -> bool {
        match self.position(listener) {
            Some(index) => self.remove_at(index).is_some(),
            None => false,
        }
    }
}

impl<L> fmt::Debug for ListenerStore<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerStore")
            .field("len", &self.count)
            .field("capacity", &self.slots.len())
            .finish()
    }
}
