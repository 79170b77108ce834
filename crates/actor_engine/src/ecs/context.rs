//! Traversal contexts
//!
//! While a scene update is running, the lists being iterated are borrowed.
//! Hooks therefore never receive `&mut Actor` or `&mut Scene`; they get an
//! [`ActorCtx`] whose mutations go to pending lists and destroy sets only.

use crate::ecs::actor::{self, Actor, ActorCore, Reparent};
use crate::ecs::component::{Component, ComponentSlot};
use crate::ecs::deferred::{Access, DeferredList, Removal};
use crate::ecs::entity::SceneId;
use crate::foundation::resource::{Ref, Resource, ResourceId};
use log::{debug, warn};
use std::ops::{Deref, DerefMut};

/// Scene-level view handed down the actor tree during a traversal
pub(crate) struct SceneAccess<'a> {
    pub scene: Option<SceneId>,
    pub delta_time: f32,
    pub roots: Access<'a, Resource<Actor>>,
}

impl SceneAccess<'_> {
    pub fn reborrow(&mut self) -> SceneAccess<'_> {
        SceneAccess {
            scene: self.scene,
            delta_time: self.delta_time,
            roots: self.roots.reborrow(),
        }
    }

    /// Queue a new root actor for the next scene flush
    pub fn spawn(&mut self, actor: Resource<Actor>) -> Ref<Actor> {
        let handle = actor.downgrade();
        match actor.borrow_mut() {
            Ok(mut spawned) => spawned.join_scene(self.scene, None),
            Err(error) => warn!("Cannot spawn actor: {}", error),
        }
        self.roots.queue(actor);
        handle
    }

    /// Schedule a root actor for destruction at the end of this tick
    pub fn destroy(&mut self, actor: &Ref<Actor>) -> bool {
        let Some(id) = actor.id() else {
            warn!("Cannot destroy actor: handle is empty");
            return false;
        };
        match self.roots.defer(id) {
            Removal::Deferred => {
                debug!("Actor {} scheduled for destruction", id);
                true
            }
            Removal::AlreadyQueued => true,
            Removal::Immediate(_) | Removal::Missing => {
                warn!("Cannot destroy actor {}: not a root of this scene", id);
                false
            }
        }
    }
}

/// Mutable view of one actor while the scene is being traversed
///
/// Dereferences to the actor's [`ActorCore`] for name, identity and transform.
pub struct ActorCtx<'a> {
    core: &'a mut ActorCore,
    components: Access<'a, ComponentSlot>,
    children: &'a mut DeferredList<Resource<Actor>>,
    scene: SceneAccess<'a>,
    current: Option<ResourceId>,
}

impl<'a> ActorCtx<'a> {
    pub(crate) fn new(
        core: &'a mut ActorCore,
        components: Access<'a, ComponentSlot>,
        children: &'a mut DeferredList<Resource<Actor>>,
        scene: SceneAccess<'a>,
        current: Option<ResourceId>,
    ) -> Self {
        Self {
            core,
            components,
            children,
            scene,
            current,
        }
    }

    /// Seconds since the previous update
    pub fn delta_time(&self) -> f32 {
        self.scene.delta_time
    }

    /// Attach a component; it goes live at the end of this actor's update
    pub fn add_component<C: Component>(&mut self, component: C) -> Ref<C> {
        self.attach_component(Resource::new(component))
    }

    /// Attach an already allocated component
    pub fn attach_component<C: Component>(&mut self, component: Resource<C>) -> Ref<C> {
        actor::attach_component(self.core, &mut self.components, component)
    }

    /// First component whose allocated type is exactly `T`
    pub fn get_component<T: Component>(&self) -> Ref<T> {
        actor::find_component(self.core, self.components.iter_all())
    }

    /// Whether a component of exactly type `T` is attached or pending
    pub fn has_component<T: Component>(&self) -> bool {
        self.components.iter_all().any(ComponentSlot::is::<T>)
    }

    /// Remove the first component of exactly type `T`
    pub fn remove_component_of<T: Component>(&mut self) -> bool {
        let id = self
            .components
            .iter_all()
            .find(|slot| slot.is::<T>())
            .and_then(|slot| slot.component().id());
        actor::remove_component(self.core, &mut self.components, id, std::any::type_name::<T>())
    }

    /// Remove the component observed by `component`
    pub fn remove_component<T: ?Sized>(&mut self, component: &Ref<T>) -> bool {
        actor::remove_component(self.core, &mut self.components, component.id(), "component")
    }

    /// Remove the component whose hook is currently running
    pub fn remove_this_component(&mut self) -> bool {
        let current = self.current;
        if current.is_none() {
            warn!("remove_this_component called outside a component hook on '{}'", self.core.name());
        }
        actor::remove_component(self.core, &mut self.components, current, "this component")
    }

    /// Adopt `child`, keeping its world transform; it goes live at the end of this update
    pub fn add_child_actor(&mut self, child: Resource<Actor>) -> Ref<Actor> {
        actor::adopt_child(self.core, self.children, child, Reparent::KeepWorld)
    }

    /// Ask for this actor (and its subtree) to be destroyed at the end of the tick
    pub fn mark_for_death(&mut self) {
        self.core.mark_for_death();
    }

    /// Spawn a new root actor in the scene
    pub fn spawn_actor(&mut self, name: impl Into<String>) -> Ref<Actor> {
        self.scene.spawn(Actor::create(name))
    }

    /// Add an existing actor as a new root of the scene
    pub fn add_actor(&mut self, actor: Resource<Actor>) -> Ref<Actor> {
        self.scene.spawn(actor)
    }

    /// Schedule another root actor for destruction
    pub fn destroy_actor(&mut self, actor: &Ref<Actor>) -> bool {
        self.scene.destroy(actor)
    }
}

impl Deref for ActorCtx<'_> {
    type Target = ActorCore;

    fn deref(&self) -> &ActorCore {
        self.core
    }
}

impl DerefMut for ActorCtx<'_> {
    fn deref_mut(&mut self) -> &mut ActorCore {
        self.core
    }
}
