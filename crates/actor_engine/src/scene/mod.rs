//! Scenes: the roots of the actor hierarchy
//!
//! A scene owns its root actors and drives the per-tick traversal:
//!
//! ```text
//! update(dt)
//!   1. scene hook
//!   2. add flush       pending roots go live, each gets `begin`
//!   3. live update     depth first; every actor flushes its own lists last
//!   4. destroy drain   doomed roots are dropped, then `ActorDestroyed` is sent
//! render(sink)
//!   pre-render walk over live components, then the scene hook
//! ```
//!
//! Everything requested during steps 1-3 (spawns, destroys, component changes)
//! is buffered, so the lists being walked are never resized mid-iteration.

pub mod render_queue;
pub mod serialization;

use crate::ecs::actor::Actor;
use crate::ecs::context::SceneAccess;
use crate::ecs::deferred::{DeferredList, Removal};
use crate::ecs::entity::{ActorId, SceneId};
use crate::events::{ActorDestroyed, Signal};
use crate::foundation::math::{Mat4, Transform};
use crate::foundation::resource::{Ref, Resource};
use log::{debug, info, trace, warn};
use render_queue::RenderSink;

pub use render_queue::{LightData, LightShape, MeshDraw, RenderContext, RenderItem, RenderQueue};
pub use serialization::{LoadReport, SceneDocument, SceneError};

/// Per-scene hooks
pub trait SceneBehavior: 'static {
    /// Called at each fixed step, before the frame's `update`
    fn fixed_update(&mut self, _scene: &mut Scene, _step: f32) {}

    /// Called at the start of every `update`, before any flush
    fn update(&mut self, _scene: &mut Scene, _delta_time: f32) {}

    /// Called after every component has submitted its render data
    fn render(&mut self, _sink: &mut dyn RenderSink) {}
}

/// Container and driver of a tree of actors
pub struct Scene {
    id: SceneId,
    name: String,
    roots: DeferredList<Resource<Actor>>,
    behavior: Option<Box<dyn SceneBehavior>>,
    actor_destroyed: Signal<ActorDestroyed>,
    ticks: u64,
}

impl Scene {
    /// Create an empty scene
    pub fn new(name: impl Into<String>) -> Self {
        let scene = Self {
            id: SceneId::next(),
            name: name.into(),
            roots: DeferredList::new(),
            behavior: None,
            actor_destroyed: Signal::new(),
            ticks: 0,
        };
        info!("Created scene '{}' ({})", scene.name, scene.id);
        scene
    }

    /// Create an empty scene driven by `behavior`
    pub fn with_behavior(name: impl Into<String>, behavior: impl SceneBehavior) -> Self {
        let mut scene = Self::new(name);
        scene.behavior = Some(Box::new(behavior));
        scene
    }

    /// Runtime identity
    pub fn id(&self) -> SceneId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of completed `update` calls
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Create a root actor at the origin; it goes live at the next update
    pub fn spawn_actor(&mut self, name: impl Into<String>) -> Ref<Actor> {
        self.add_actor(Actor::create(name))
    }

    /// Create a root actor with a local transform
    pub fn spawn_actor_with(&mut self, name: impl Into<String>, transform: Transform) -> Ref<Actor> {
        self.add_actor(Actor::with_transform(name, transform))
    }

    /// Take ownership of `actor` as a new root; it goes live at the next update
    pub fn add_actor(&mut self, actor: Resource<Actor>) -> Ref<Actor> {
        let handle = self.access(0.0).spawn(actor);
        trace!("Scene '{}': queued actor {:?}", self.name, handle.id());
        handle
    }

    /// Create a root actor with a known identity, used when loading a saved scene
    pub fn create_actor(
        &mut self,
        id: ActorId,
        name: impl Into<String>,
        transform: Transform,
    ) -> Ref<Actor> {
        self.add_actor(Actor::with_id(id, name, transform))
    }

    /// Remove a root actor right away and hand its ownership back
    pub fn take_actor(&mut self, actor: &Ref<Actor>) -> Option<Resource<Actor>> {
        let taken = actor.id().and_then(|id| self.roots.take(id));
        match &taken {
            Some(root) => {
                if let Some(mut node) = root.get_mut() {
                    node.join_scene(None, None);
                }
            }
            None => warn!("Scene '{}' has no root {:?} to take", self.name, actor.id()),
        }
        taken
    }

    /// Schedule a root actor for destruction at the end of the next update
    ///
    /// Requests for the same actor within one tick collapse into one.
    pub fn destroy(&mut self, actor: &Ref<Actor>) -> bool {
        self.access(0.0).destroy(actor)
    }

    /// Live root actors
    pub fn actors(&self) -> &[Resource<Actor>] {
        self.roots.live()
    }

    /// Root actors waiting for the next flush
    pub fn pending_actors(&self) -> &[Resource<Actor>] {
        self.roots.pending()
    }

    /// Find an actor anywhere in the tree, live or pending
    ///
    /// Returns an invalid handle (and logs a warning) when nothing matches.
    pub fn get_actor(&self, id: ActorId) -> Ref<Actor> {
        self.find_actor(id).unwrap_or_else(|| {
            warn!("Scene '{}' has no actor {}", self.name, id);
            Ref::invalid()
        })
    }

    /// Like [`get_actor`](Self::get_actor) but silent on a miss
    pub fn find_actor(&self, id: ActorId) -> Option<Ref<Actor>> {
        for root in self.roots.iter_all() {
            let Some(node) = root.get() else {
                trace!("Skipping busy root during lookup of {}", id);
                continue;
            };
            if node.id() == id {
                return Some(root.downgrade());
            }
            if let Some(found) = node.find_descendant(id) {
                return Some(found);
            }
        }
        None
    }

    /// Signal sent after a root actor has been destroyed
    pub fn on_actor_destroyed(&mut self) -> &mut Signal<ActorDestroyed> {
        &mut self.actor_destroyed
    }

    /// Let every component re-link its references to other actors
    pub fn resolve_links(&self) {
        for root in self.roots.iter_all() {
            if let Some(node) = root.get() {
                node.resolve_links(self);
            }
        }
    }

    /// Run the scene hook for one fixed step
    pub fn fixed_update(&mut self, step: f32) {
        if let Some(mut behavior) = self.behavior.take() {
            behavior.fixed_update(self, step);
            self.restore_behavior(behavior);
        }
    }

    /// Advance the scene by one tick
    pub fn update(&mut self, delta_time: f32) {
        if let Some(mut behavior) = self.behavior.take() {
            behavior.update(self, delta_time);
            self.restore_behavior(behavior);
        }

        let added = self.roots.flush_pending();
        if !added.is_empty() {
            debug!("Scene '{}': {} actor(s) went live", self.name, added.len());
            let (live, roots) = self.roots.split();
            let mut scene = SceneAccess {
                scene: Some(self.id),
                delta_time,
                roots,
            };
            for actor in &live[added] {
                let mut node = match actor.borrow_mut() {
                    Ok(node) => node,
                    Err(error) => {
                        warn!("Cannot begin actor: {}", error);
                        continue;
                    }
                };
                node.begin(&mut scene);
                if node.is_marked_for_death() {
                    if let Some(id) = actor.id() {
                        let _ = scene.roots.defer(id);
                    }
                }
            }
        }

        {
            let (live, roots) = self.roots.split();
            let mut scene = SceneAccess {
                scene: Some(self.id),
                delta_time,
                roots,
            };
            let origin = Mat4::identity();
            for actor in live {
                let mut node = match actor.borrow_mut() {
                    Ok(node) => node,
                    Err(error) => {
                        warn!("Skipping actor update: {}", error);
                        continue;
                    }
                };
                node.update(&origin, &mut scene);
            }
        }

        // marks may land after an actor's own update, from a later root or a hook
        self.defer_marked();

        for actor in self.roots.drain_doomed() {
            let notice = actor.get().map(|node| ActorDestroyed {
                id: node.id(),
                name: node.name().to_string(),
                scene: self.id,
            });
            drop(actor);
            if let Some(notice) = notice {
                debug!("Scene '{}': destroyed '{}' ({})", self.name, notice.name, notice.id);
                self.actor_destroyed.emit(&notice);
            }
        }

        self.ticks += 1;
    }

    /// Submit render data for every live component, then run the scene hook
    pub fn render(&mut self, sink: &mut dyn RenderSink) {
        for actor in self.roots.live() {
            match actor.borrow() {
                Ok(node) => node.render(sink),
                Err(error) => warn!("Skipping actor render: {}", error),
            }
        }
        if let Some(behavior) = self.behavior.as_mut() {
            behavior.render(sink);
        }
    }

    fn defer_marked(&mut self) {
        let (live, mut roots) = self.roots.split();
        for actor in live {
            let mut node = match actor.borrow_mut() {
                Ok(node) => node,
                Err(error) => {
                    warn!("Cannot check actor for death: {}", error);
                    continue;
                }
            };
            node.reap_marked();
            if !node.is_marked_for_death() {
                continue;
            }
            if let Some(id) = actor.id() {
                if let Removal::Deferred = roots.defer(id) {
                    trace!("Root '{}' was marked for death", node.name());
                }
            }
        }
    }

    fn access(&mut self, delta_time: f32) -> SceneAccess<'_> {
        SceneAccess {
            scene: Some(self.id),
            delta_time,
            roots: self.roots.access(),
        }
    }

    fn restore_behavior(&mut self, behavior: Box<dyn SceneBehavior>) {
        // a hook may have installed a replacement
        if self.behavior.is_none() {
            self.behavior = Some(behavior);
        }
    }

    /// Install or replace the scene hooks
    pub fn set_behavior(&mut self, behavior: impl SceneBehavior) {
        self.behavior = Some(Box::new(behavior));
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        debug!(
            "Dropping scene '{}' with {} root actor(s)",
            self.name,
            self.roots.iter_all().count()
        );
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("live", &self.roots.live().len())
            .field("pending", &self.roots.pending().len())
            .finish()
    }
}
