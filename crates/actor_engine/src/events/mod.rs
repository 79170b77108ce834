//! Broadcast signals
//!
//! A [`Signal`] is a list of subscribers that are all notified, in subscription
//! order, every time the signal is emitted. The scene uses one to announce
//! destroyed actors. Handlers that keep [`Ref`](crate::foundation::resource::Ref)s
//! around must check them before use; the actor being announced is already gone.

use crate::ecs::entity::{ActorId, SceneId};
use std::fmt;

/// Handle returned by [`Signal::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Single-threaded broadcast of `E` values
pub struct Signal<E> {
    handlers: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
    next_id: u64,
}

impl<E> Signal<E> {
    /// Create a signal with no subscribers
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a handler; it stays registered until unsubscribed
    pub fn subscribe(&mut self, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler; returns whether it was registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        before != self.handlers.len()
    }

    /// Notify every handler; returns how many were called
    pub fn emit(&mut self, event: &E) -> usize {
        for (_, handler) in &mut self.handlers {
            handler(event);
        }
        self.handlers.len()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Remove every handler
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Sent once for every root actor erased by a scene flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorDestroyed {
    /// Identity of the destroyed actor
    pub id: ActorId,
    /// Its name at the time of destruction
    pub name: String,
    /// Scene that destroyed it
    pub scene: SceneId,
}
