//! Actors: nodes of the scene's transform hierarchy
//!
//! An actor owns its components and its child actors. Both lists are buffered:
//! additions go live at the end of the actor's next update and removals are
//! applied through the two-set destroy protocol in [`crate::ecs::deferred`].
//! The only synchronous mutation is [`Actor::remove_child_actor`], which is
//! meant for editor-style reparenting outside of an update.

use crate::ecs::component::{Component, ComponentSlot};
use crate::ecs::context::{ActorCtx, SceneAccess};
use crate::ecs::deferred::{Access, DeferredList, Removal};
use crate::ecs::entity::{ActorId, SceneId};
use crate::foundation::math::{Mat4, Transform};
use crate::foundation::resource::{Ref, Resource, ResourceId};
use crate::scene::render_queue::{RenderContext, RenderSink};
use crate::scene::Scene;
use log::{debug, trace, warn};
use std::fmt;

/// Per-actor behaviour hooks
///
/// Plays the role of an actor subclass: the scene calls [`begin`](Self::begin)
/// when the actor goes live and [`update`](Self::update) every tick before the
/// actor's components run.
pub trait ActorBehavior: 'static {
    /// Called once when the actor is flushed into its scene or parent
    fn begin(&mut self, _actor: &mut ActorCtx<'_>) {}

    /// Called every tick
    fn update(&mut self, _actor: &mut ActorCtx<'_>) {}
}

/// How a reparented actor's local transform is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reparent {
    /// Recompute the local transform so the world transform is unchanged
    KeepWorld,
    /// Keep the local transform as-is (used when loading saved hierarchies)
    KeepLocal,
}

/// Identity, transform and links of an actor
///
/// Reachable from hooks through [`ActorCtx`]'s `Deref`.
pub struct ActorCore {
    name: String,
    id: ActorId,
    transform: Transform,
    parent_world: Mat4,
    scene: Option<SceneId>,
    parent: Option<Ref<Actor>>,
    this: Ref<Actor>,
    marked_for_death: bool,
}

impl ActorCore {
    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the actor
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Persistent identity
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Local transform relative to the parent
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable local transform
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Replace the local transform
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// World matrix: the parent's world matrix (as of the last update) times the local TRS
    pub fn world_matrix(&self) -> Mat4 {
        self.parent_world * self.transform.to_matrix()
    }

    /// World transform decomposed into position/rotation/scale
    pub fn world_transform(&self) -> Transform {
        Transform::from_matrix(&self.world_matrix())
    }

    /// The parent's world matrix as last propagated
    pub fn parent_world_matrix(&self) -> &Mat4 {
        &self.parent_world
    }

    /// Scene this actor belongs to, if any
    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    /// Parent actor; `None` means the scene is the parent
    pub fn parent(&self) -> Option<&Ref<Actor>> {
        self.parent.as_ref()
    }

    /// Observer for this actor itself
    pub fn this(&self) -> &Ref<Actor> {
        &self.this
    }

    /// Ask for this actor to be destroyed at the end of the current tick
    pub fn mark_for_death(&mut self) {
        if !self.marked_for_death {
            debug!("Actor '{}' ({}) marked for death", self.name, self.id);
        }
        self.marked_for_death = true;
    }

    /// Whether [`mark_for_death`](Self::mark_for_death) has been called
    pub fn is_marked_for_death(&self) -> bool {
        self.marked_for_death
    }
}

/// A node in the scene hierarchy
pub struct Actor {
    core: ActorCore,
    components: DeferredList<ComponentSlot>,
    children: DeferredList<Resource<Actor>>,
    behavior: Option<Box<dyn ActorBehavior>>,
}

impl Actor {
    /// Allocate an actor with a fresh identity at the origin
    pub fn create(name: impl Into<String>) -> Resource<Self> {
        Self::with_id(ActorId::generate(), name, Transform::identity())
    }

    /// Allocate an actor with a fresh identity and a local transform
    pub fn with_transform(name: impl Into<String>, transform: Transform) -> Resource<Self> {
        Self::with_id(ActorId::generate(), name, transform)
    }

    /// Allocate an actor with a known identity, as done when loading a scene
    pub fn with_id(id: ActorId, name: impl Into<String>, transform: Transform) -> Resource<Self> {
        let name = name.into();
        Resource::new_cyclic(|this| Self {
            core: ActorCore {
                name,
                id,
                transform,
                parent_world: Mat4::identity(),
                scene: None,
                parent: None,
                this: this.clone(),
                marked_for_death: false,
            },
            components: DeferredList::new(),
            children: DeferredList::new(),
            behavior: None,
        })
    }

    /// Allocate an actor driven by `behavior`
    pub fn with_behavior(name: impl Into<String>, behavior: impl ActorBehavior) -> Resource<Self> {
        let actor = Self::create(name);
        if let Some(mut created) = actor.get_mut() {
            created.set_behavior(behavior);
        }
        actor
    }

    /// Replace the behaviour hooks
    pub fn set_behavior(&mut self, behavior: impl ActorBehavior) {
        self.behavior = Some(Box::new(behavior));
    }

    /// Identity, transform and links
    pub fn core(&self) -> &ActorCore {
        &self.core
    }

    /// Mutable identity, transform and links
    pub fn core_mut(&mut self) -> &mut ActorCore {
        &mut self.core
    }

    /// Display name
    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Persistent identity
    pub fn id(&self) -> ActorId {
        self.core.id
    }

    /// Local transform
    pub fn transform(&self) -> &Transform {
        &self.core.transform
    }

    /// Replace the local transform
    pub fn set_transform(&mut self, transform: Transform) {
        self.core.transform = transform;
    }

    /// World matrix as of the last update
    pub fn world_matrix(&self) -> Mat4 {
        self.core.world_matrix()
    }

    /// World transform as of the last update
    pub fn world_transform(&self) -> Transform {
        self.core.world_transform()
    }

    /// Parent actor, `None` for scene roots
    pub fn parent(&self) -> Option<&Ref<Actor>> {
        self.core.parent()
    }

    /// Owning scene
    pub fn scene(&self) -> Option<SceneId> {
        self.core.scene
    }

    /// Observer for this actor
    pub fn this(&self) -> Ref<Actor> {
        self.core.this.clone()
    }

    /// Ask for this actor to be destroyed at the end of the current tick
    ///
    /// Outside of an update the actor goes at the end of the next one.
    pub fn mark_for_death(&mut self) {
        self.core.mark_for_death();
    }

    /// Whether the actor has been marked for death
    pub fn is_marked_for_death(&self) -> bool {
        self.core.marked_for_death
    }

    // ---- components -------------------------------------------------------

    /// Attach a component; returns an observer that is valid right away
    pub fn add_component<C: Component>(&mut self, component: C) -> Ref<C> {
        self.attach_component(Resource::new(component))
    }

    /// Attach an already allocated component
    pub fn attach_component<C: Component>(&mut self, component: Resource<C>) -> Ref<C> {
        attach_component(&self.core, &mut self.components.access(), component)
    }

    /// First live or pending component whose allocated type is exactly `T`
    ///
    /// Logs a warning and returns an invalid observer when there is none.
    pub fn get_component<T: Component>(&self) -> Ref<T> {
        find_component(&self.core, self.components.iter_all())
    }

    /// Whether a live or pending component of exactly type `T` exists
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
        remove_component(
            &self.core,
            &mut self.components.access(),
            id,
            std::any::type_name::<T>(),
        )
    }

    /// Remove the component observed by `component`
    pub fn remove_component<T: ?Sized>(&mut self, component: &Ref<T>) -> bool {
        remove_component(&self.core, &mut self.components.access(), component.id(), "component")
    }

    /// All components, live first, then pending
    pub fn components(&self) -> impl Iterator<Item = &Resource<dyn Component>> {
        self.components.iter_all().map(ComponentSlot::component)
    }

    /// Number of live components
    pub fn live_component_count(&self) -> usize {
        self.components.live().len()
    }

    /// Number of components waiting for the next flush
    pub fn pending_component_count(&self) -> usize {
        self.components.pending().len()
    }

    // ---- children ---------------------------------------------------------

    /// Adopt `child`, keeping its world transform unchanged
    pub fn add_child_actor(&mut self, child: Resource<Actor>) -> Ref<Actor> {
        adopt_child(&self.core, &mut self.children, child, Reparent::KeepWorld)
    }

    /// Adopt `child` with an explicit transform policy
    pub fn attach_child(&mut self, child: Resource<Actor>, policy: Reparent) -> Ref<Actor> {
        adopt_child(&self.core, &mut self.children, child, policy)
    }

    /// Detach a child right away and hand its ownership back
    ///
    /// The detached actor becomes parentless and its local transform is set to
    /// its last world transform.
    pub fn remove_child_actor(&mut self, child: &Ref<Actor>) -> Option<Resource<Actor>> {
        let Some(taken) = child.id().and_then(|id| self.children.take(id)) else {
            warn!("Actor '{}' has no child {:?} to remove", self.core.name, child.id());
            return None;
        };
        if let Some(mut detached) = taken.get_mut() {
            let world = detached.core.world_transform();
            detached.core.transform = world;
            detached.core.parent_world = Mat4::identity();
            detached.core.parent = None;
            detached.join_scene(None, None);
            debug!("Detached '{}' from '{}'", detached.core.name, self.core.name);
        }
        Some(taken)
    }

    /// Children, live first, then pending
    pub fn children(&self) -> impl Iterator<Item = &Resource<Actor>> {
        self.children.iter_all()
    }

    /// Number of live children
    pub fn live_child_count(&self) -> usize {
        self.children.live().len()
    }

    /// Number of children waiting for the next flush
    pub fn pending_child_count(&self) -> usize {
        self.children.pending().len()
    }

    /// Find a descendant by identity, searching live and pending children
    pub fn find_descendant(&self, id: ActorId) -> Option<Ref<Actor>> {
        for child in self.children.iter_all() {
            let Some(node) = child.get() else {
                trace!("Skipping busy child of '{}' during lookup", self.core.name);
                continue;
            };
            if node.core.id == id {
                return Some(child.downgrade());
            }
            if let Some(found) = node.find_descendant(id) {
                return Some(found);
            }
        }
        None
    }

    // ---- traversal --------------------------------------------------------

    /// Set the scene on this actor and its whole subtree
    pub(crate) fn join_scene(&mut self, scene: Option<SceneId>, parent: Option<Ref<Actor>>) {
        self.core.scene = scene;
        if parent.is_some() {
            self.core.parent = parent;
        } else if scene.is_some() {
            self.core.parent = None;
            self.core.parent_world = Mat4::identity();
        }
        for child in self.children.iter_all() {
            if let Some(mut node) = child.get_mut() {
                node.join_scene(scene, Some(self.core.this.clone()));
            }
        }
    }

    pub(crate) fn begin(&mut self, scene: &mut SceneAccess<'_>) {
        let Self {
            core,
            components,
            children,
            behavior,
        } = self;
        if let Some(behavior) = behavior.as_mut() {
            let mut ctx = ActorCtx::new(core, components.access(), children, scene.reborrow(), None);
            behavior.begin(&mut ctx);
        }
    }

    /// One tick: world transform, own hook, components, children, then flushes
    pub(crate) fn update(&mut self, parent_world: &Mat4, scene: &mut SceneAccess<'_>) {
        self.core.parent_world = *parent_world;

        let Self {
            core,
            components,
            children,
            behavior,
        } = self;

        if let Some(behavior) = behavior.as_mut() {
            let mut ctx = ActorCtx::new(core, components.access(), children, scene.reborrow(), None);
            behavior.update(&mut ctx);
        }

        {
            let (live, mut access) = components.split();
            for slot in live {
                let mut component = match slot.component().borrow_mut() {
                    Ok(component) => component,
                    Err(error) => {
                        warn!("Skipping {} on '{}': {}", slot.label(), core.name, error);
                        continue;
                    }
                };
                let mut ctx = ActorCtx::new(
                    core,
                    access.reborrow(),
                    children,
                    scene.reborrow(),
                    slot.component().id(),
                );
                component.update(&mut ctx);
            }
        }

        let world = core.world_matrix();
        {
            let (live, mut access) = children.split();
            for child in live {
                let mut node = match child.borrow_mut() {
                    Ok(node) => node,
                    Err(error) => {
                        warn!("Skipping child of '{}': {}", core.name, error);
                        continue;
                    }
                };
                node.update(&world, scene);
                if node.core.marked_for_death {
                    if let Some(id) = child.id() {
                        let _ = access.defer(id);
                    }
                }
            }
        }

        Self::flush_components(core, components, children, scene);
        Self::flush_children(core, children, scene);
    }

    fn flush_components(
        core: &mut ActorCore,
        components: &mut DeferredList<ComponentSlot>,
        children: &mut DeferredList<Resource<Actor>>,
        scene: &mut SceneAccess<'_>,
    ) {
        let added = components.flush_pending();
        if !added.is_empty() {
            debug!("'{}': {} component(s) went live", core.name, added.len());
            let (live, mut access) = components.split();
            for slot in &live[added] {
                if let Ok(mut component) = slot.component().borrow_mut() {
                    let mut ctx = ActorCtx::new(
                        core,
                        access.reborrow(),
                        children,
                        scene.reborrow(),
                        slot.component().id(),
                    );
                    component.begin(&mut ctx);
                }
            }
        }

        for slot in components.drain_doomed() {
            if let Ok(mut component) = slot.component().borrow_mut() {
                let mut ctx = ActorCtx::new(
                    core,
                    components.access(),
                    children,
                    scene.reborrow(),
                    slot.component().id(),
                );
                component.on_destroy(&mut ctx);
            }
            debug!("'{}': destroyed {}", core.name, slot.label());
        }
    }

    fn flush_children(
        core: &ActorCore,
        children: &mut DeferredList<Resource<Actor>>,
        scene: &mut SceneAccess<'_>,
    ) {
        let added = children.flush_pending();
        if !added.is_empty() {
            let (live, mut access) = children.split();
            for child in &live[added] {
                if let Ok(mut node) = child.borrow_mut() {
                    node.begin(scene);
                    if node.core.marked_for_death {
                        if let Some(id) = child.id() {
                            let _ = access.defer(id);
                        }
                    }
                }
            }
        }

        for child in children.drain_doomed() {
            if let Some(node) = child.get() {
                debug!("'{}': destroyed child '{}'", core.name, node.core.name);
            }
        }
    }

    /// Drop descendants marked for death after their parent's flush already ran
    pub(crate) fn reap_marked(&mut self) {
        {
            let (live, mut access) = self.children.split();
            for child in live {
                let Ok(mut node) = child.borrow_mut() else {
                    continue;
                };
                node.reap_marked();
                if node.core.marked_for_death {
                    if let Some(id) = child.id() {
                        let _ = access.defer(id);
                    }
                }
            }
        }
        if !self.children.has_doomed() {
            return;
        }
        for child in self.children.drain_doomed() {
            if let Some(node) = child.get() {
                debug!("'{}': reaped child '{}'", self.core.name, node.core.name);
            }
        }
    }

    /// Submit every live component's render data, depth first
    pub(crate) fn render(&self, sink: &mut dyn RenderSink) {
        let world = self.core.world_matrix();
        let frame = RenderContext {
            actor: self.core.id,
            actor_name: &self.core.name,
            world: &world,
        };
        for slot in self.components.live() {
            match slot.component().borrow() {
                Ok(component) => component.pre_render(&frame, sink),
                Err(error) => warn!("Skipping render of {}: {}", slot.label(), error),
            }
        }
        for child in self.children.live() {
            if let Some(node) = child.get() {
                node.render(sink);
            }
        }
    }

    pub(crate) fn resolve_links(&self, scene: &Scene) {
        for slot in self.components.iter_all() {
            match slot.component().borrow_mut() {
                Ok(mut component) => component.resolve_links(scene),
                Err(error) => warn!("Cannot resolve links of {}: {}", slot.label(), error),
            }
        }
        for child in self.children.iter_all() {
            if let Some(node) = child.get() {
                node.resolve_links(scene);
            }
        }
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("name", &self.core.name)
            .field("id", &self.core.id)
            .field("components", &self.components.iter_all().count())
            .field("children", &self.children.iter_all().count())
            .finish()
    }
}

pub(crate) fn attach_component<C: Component>(
    core: &ActorCore,
    components: &mut Access<'_, ComponentSlot>,
    component: Resource<C>,
) -> Ref<C> {
    let handle = component.downgrade();
    match component.borrow_mut() {
        Ok(mut attached) => attached.on_attach(&core.this),
        Err(error) => {
            warn!("Cannot attach component to '{}': {}", core.name, error);
            return Ref::invalid();
        }
    }
    trace!("'{}': queued {}", core.name, std::any::type_name::<C>());
    components.queue(ComponentSlot::new(component));
    handle
}

pub(crate) fn find_component<'s, T: Component>(
    core: &ActorCore,
    mut slots: impl Iterator<Item = &'s ComponentSlot>,
) -> Ref<T> {
    match slots.find(|slot| slot.is::<T>()).and_then(ComponentSlot::typed::<T>) {
        Some(found) => found,
        None => {
            warn!(
                "Actor '{}' has no component of type {}",
                core.name,
                std::any::type_name::<T>()
            );
            Ref::invalid()
        }
    }
}

pub(crate) fn remove_component(
    core: &ActorCore,
    components: &mut Access<'_, ComponentSlot>,
    id: Option<ResourceId>,
    label: &str,
) -> bool {
    let Some(id) = id else {
        warn!("Actor '{}' has no {} to remove", core.name, label);
        return false;
    };
    match components.remove(id) {
        Removal::Deferred | Removal::AlreadyQueued => true,
        Removal::Immediate(slot) => {
            debug!("'{}': dropped pending {}", core.name, slot.label());
            true
        }
        Removal::Missing => {
            warn!("Actor '{}' has no {} {} to remove", core.name, label, id);
            false
        }
    }
}

pub(crate) fn adopt_child(
    core: &ActorCore,
    children: &mut DeferredList<Resource<Actor>>,
    child: Resource<Actor>,
    policy: Reparent,
) -> Ref<Actor> {
    let handle = child.downgrade();
    let parent_world = core.world_matrix();
    match child.borrow_mut() {
        Ok(mut node) => {
            if policy == Reparent::KeepWorld {
                match parent_world.try_inverse() {
                    Some(inverse) => {
                        let local = inverse * node.core.transform.to_matrix();
                        node.core.transform = Transform::from_matrix(&local);
                    }
                    None => warn!(
                        "'{}' has a singular world transform; '{}' keeps its local transform",
                        core.name, node.core.name
                    ),
                }
            }
            node.core.parent_world = parent_world;
            node.join_scene(core.scene, Some(core.this.clone()));
            debug!("'{}' adopted '{}'", core.name, node.core.name);
        }
        Err(error) => {
            warn!("Cannot adopt child into '{}': {}", core.name, error);
            return Ref::invalid();
        }
    }
    children.queue(child);
    handle
}
