//! Deferred add/destroy buffering
//!
//! Live lists are only mutated at flush points. Additions wait in a pending
//! list; destruction requests are recorded in one of two destroy sets. A flush
//! flips the parity bit *before* draining, so requests made while the drained
//! items are being torn down land in the other set and are handled by the next
//! flush instead of disturbing this one.

use crate::foundation::resource::{Resource, ResourceId};
use std::ops::Range;

/// Anything that can be tracked by control block identity
pub(crate) trait Keyed {
    fn key(&self) -> Option<ResourceId>;
}

impl<T: ?Sized> Keyed for Resource<T> {
    fn key(&self) -> Option<ResourceId> {
        self.id()
    }
}

/// Outcome of a removal request
#[derive(Debug)]
pub(crate) enum Removal<T> {
    /// Item is live; it will be destroyed at the next flush
    Deferred,
    /// Item was already scheduled this tick
    AlreadyQueued,
    /// Item never went live and was taken out right away
    Immediate(T),
    /// No such item
    Missing,
}

/// Live items plus their pending additions and destroy sets
pub(crate) struct DeferredList<T> {
    live: Vec<T>,
    pending: Vec<T>,
    doomed: [Vec<ResourceId>; 2],
    current: usize,
}

impl<T: Keyed> DeferredList<T> {
    pub fn new() -> Self {
        Self {
            live: Vec::new(),
            pending: Vec::new(),
            doomed: [Vec::new(), Vec::new()],
            current: 0,
        }
    }

    pub fn live(&self) -> &[T] {
        &self.live
    }

    pub fn pending(&self) -> &[T] {
        &self.pending
    }

    /// Live items first, then pending ones
    pub fn iter_all(&self) -> impl Iterator<Item = &T> {
        self.live.iter().chain(self.pending.iter())
    }

    pub fn queue(&mut self, item: T) {
        self.pending.push(item);
    }

    /// Mutable view without iteration
    pub fn access(&mut self) -> Access<'_, T> {
        self.split().1
    }

    /// Live items for iteration plus a mutable view that can queue and schedule
    pub fn split(&mut self) -> (&[T], Access<'_, T>) {
        let live = self.live.as_slice();
        (
            live,
            Access {
                live,
                pending: &mut self.pending,
                doomed: &mut self.doomed[self.current],
            },
        )
    }

    /// Remove an item right away, from either list
    pub fn take(&mut self, id: ResourceId) -> Option<T> {
        if let Some(index) = position(&self.live, id) {
            return Some(self.live.remove(index));
        }
        position(&self.pending, id).map(|index| self.pending.remove(index))
    }

    /// Move every pending item into the live list, returning their new indices
    pub fn flush_pending(&mut self) -> Range<usize> {
        let start = self.live.len();
        self.live.append(&mut self.pending);
        start..self.live.len()
    }

    /// Swap destroy sets and take out everything scheduled in the old one
    ///
    /// Items are returned in scheduling order. Identities that no longer match
    /// anything (already removed some other way) are skipped.
    pub fn drain_doomed(&mut self) -> Vec<T> {
        let drained = self.current;
        self.current ^= 1;

        let ids = std::mem::take(&mut self.doomed[drained]);
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            match self.take(id) {
                Some(item) => removed.push(item),
                None => log::trace!("Destroy request for {} matched nothing", id),
            }
        }
        removed
    }

    pub fn has_doomed(&self) -> bool {
        !self.doomed[self.current].is_empty()
    }
}

impl<T: Keyed> Default for DeferredList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Borrowed view used while the live list is being iterated
///
/// Shares the live list and mutably holds the pending list and the current
/// destroy set, which are never iterated during a traversal.
pub(crate) struct Access<'a, T> {
    live: &'a [T],
    pending: &'a mut Vec<T>,
    doomed: &'a mut Vec<ResourceId>,
}

impl<'a, T: Keyed> Access<'a, T> {
    /// Shorter-lived copy of this view
    pub fn reborrow(&mut self) -> Access<'_, T> {
        Access {
            live: self.live,
            pending: &mut *self.pending,
            doomed: &mut *self.doomed,
        }
    }

    pub fn live(&self) -> &'a [T] {
        self.live
    }

    pub fn iter_all(&self) -> impl Iterator<Item = &T> {
        self.live.iter().chain(self.pending.iter())
    }

    pub fn queue(&mut self, item: T) {
        self.pending.push(item);
    }

    fn is_queued(&self, id: ResourceId) -> bool {
        self.doomed.contains(&id)
    }

    /// Schedule a live item for the next flush; pending items are taken out now
    pub fn remove(&mut self, id: ResourceId) -> Removal<T> {
        if position(self.live, id).is_some() {
            return self.defer_live(id);
        }
        match position(self.pending, id) {
            Some(index) => Removal::Immediate(self.pending.remove(index)),
            None => Removal::Missing,
        }
    }

    /// Schedule an item for the next flush whether it is live or pending
    pub fn defer(&mut self, id: ResourceId) -> Removal<T> {
        if position(self.live, id).is_some() || position(self.pending, id).is_some() {
            self.defer_live(id)
        } else {
            Removal::Missing
        }
    }

    fn defer_live(&mut self, id: ResourceId) -> Removal<T> {
        if self.is_queued(id) {
            Removal::AlreadyQueued
        } else {
            self.doomed.push(id);
            Removal::Deferred
        }
    }
}

fn position<T: Keyed>(items: &[T], id: ResourceId) -> Option<usize> {
    items.iter().position(|item| item.key() == Some(id))
}
