//! Integration tests for actors, components and scenes
//!
//! Shared fixtures live here: a [`Journal`] that records lifecycle events in
//! order, and [`Probe`] components that write to it. `Probe<'A'>` and
//! `Probe<'B'>` are distinct types, which is what exact-type lookup needs.

mod ownership;
mod scene_flow;

use crate::ecs::{ActorBehavior, ActorCtx, Component};
use std::cell::RefCell;
use std::rc::Rc;

/// Ordered record of lifecycle events
#[derive(Clone, Default)]
pub(super) struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.as_str() == entry).count()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

type Hook = Box<dyn FnMut(&mut ActorCtx<'_>)>;

/// Component that journals `X:begin`, `X:update`, `X:destroy` and `X:drop`
pub(super) struct Probe<const TAG: char> {
    journal: Journal,
    on_update: Option<Hook>,
    on_destroy: Option<Hook>,
}

impl<const TAG: char> Probe<TAG> {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            on_update: None,
            on_destroy: None,
        }
    }

    /// Run `hook` during every update, after journaling
    pub fn on_update(mut self, hook: impl FnMut(&mut ActorCtx<'_>) + 'static) -> Self {
        self.on_update = Some(Box::new(hook));
        self
    }

    /// Run `hook` from `on_destroy`
    pub fn on_destroy(mut self, hook: impl FnMut(&mut ActorCtx<'_>) + 'static) -> Self {
        self.on_destroy = Some(Box::new(hook));
        self
    }

    fn log(&self, event: &str) {
        self.journal.push(format!("{}:{}", TAG, event));
    }
}

impl<const TAG: char> Component for Probe<TAG> {
    fn begin(&mut self, _actor: &mut ActorCtx<'_>) {
        self.log("begin");
    }

    fn update(&mut self, actor: &mut ActorCtx<'_>) {
        self.log("update");
        if let Some(hook) = self.on_update.as_mut() {
            hook(actor);
        }
    }

    fn on_destroy(&mut self, actor: &mut ActorCtx<'_>) {
        self.log("destroy");
        if let Some(hook) = self.on_destroy.as_mut() {
            hook(actor);
        }
    }
}

impl<const TAG: char> Drop for Probe<TAG> {
    fn drop(&mut self) {
        self.log("drop");
    }
}

/// Actor hooks that journal `<name>:begin` / `<name>:update`
pub(super) struct Scripted {
    journal: Journal,
    on_begin: Option<Hook>,
    on_update: Option<Hook>,
}

impl Scripted {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            on_begin: None,
            on_update: None,
        }
    }

    pub fn on_begin(mut self, hook: impl FnMut(&mut ActorCtx<'_>) + 'static) -> Self {
        self.on_begin = Some(Box::new(hook));
        self
    }

    pub fn on_update(mut self, hook: impl FnMut(&mut ActorCtx<'_>) + 'static) -> Self {
        self.on_update = Some(Box::new(hook));
        self
    }
}

impl ActorBehavior for Scripted {
    fn begin(&mut self, actor: &mut ActorCtx<'_>) {
        self.journal.push(format!("{}:begin", actor.name()));
        if let Some(hook) = self.on_begin.as_mut() {
            hook(actor);
        }
    }

    fn update(&mut self, actor: &mut ActorCtx<'_>) {
        self.journal.push(format!("{}:update", actor.name()));
        if let Some(hook) = self.on_update.as_mut() {
            hook(actor);
        }
    }
}
