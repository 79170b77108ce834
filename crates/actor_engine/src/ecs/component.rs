//! Component trait and attachment bookkeeping

use crate::ecs::actor::Actor;
use crate::ecs::context::ActorCtx;
use crate::ecs::deferred::Keyed;
use crate::foundation::resource::{AnyRef, ControlBlock, Ref, Resource, ResourceId, TypeTag};
use crate::scene::render_queue::{RenderContext, RenderSink};
use crate::scene::serialization::ComponentRecord;
use crate::scene::Scene;
use std::rc::{Rc, Weak};

/// Behaviour or data attached to exactly one actor
///
/// Every hook has an empty default. Hooks that run during a traversal receive
/// an [`ActorCtx`] for the owning actor instead of a back-pointer, so they can
/// add or remove components, move the actor or mark it for death without
/// aliasing the lists being iterated.
pub trait Component: 'static {
    /// Called once when the component is handed to its actor
    fn on_attach(&mut self, _owner: &Ref<Actor>) {}

    /// Called when the component is flushed into the live list
    fn begin(&mut self, _actor: &mut ActorCtx<'_>) {}

    /// Called once per tick while live
    fn update(&mut self, _actor: &mut ActorCtx<'_>) {}

    /// Submit draw or light data for this frame
    fn pre_render(&self, _frame: &RenderContext<'_>, _sink: &mut dyn RenderSink) {}

    /// Called during the flush that destroys the component
    fn on_destroy(&mut self, _actor: &mut ActorCtx<'_>) {}

    /// Serializable form of this component, if it has one
    fn record(&self) -> Option<ComponentRecord> {
        None
    }

    /// Re-link references to other actors after a scene load
    fn resolve_links(&mut self, _scene: &Scene) {}
}

impl<C: Component> Resource<C> {
    /// Upcast to a component trait object, keeping the control block
    pub fn upcast(self) -> Resource<dyn Component> {
        self.map_block(|block| block as Rc<ControlBlock<dyn Component>>)
    }
}

impl<C: Component> Ref<C> {
    /// Upcast to a component trait object observer
    pub fn upcast(self) -> Ref<dyn Component> {
        self.map_block(|block| block as Weak<ControlBlock<dyn Component>>)
    }
}

/// A component owned by an actor, with enough type information to hand out
/// typed observers again
pub(crate) struct ComponentSlot {
    component: Resource<dyn Component>,
    typed: AnyRef,
}

impl ComponentSlot {
    pub fn new<C: Component>(component: Resource<C>) -> Self {
        let typed = component.downgrade().erase();
        Self {
            component: component.upcast(),
            typed,
        }
    }

    pub fn component(&self) -> &Resource<dyn Component> {
        &self.component
    }

    pub fn tag(&self) -> Option<TypeTag> {
        self.component.type_tag()
    }

    /// Exact type match only; a subtype relationship does not count
    pub fn is<T: Component>(&self) -> bool {
        self.tag().is_some_and(|tag| tag.is::<T>())
    }

    pub fn typed<T: Component>(&self) -> Option<Ref<T>> {
        self.typed.downcast::<T>()
    }

    pub fn label(&self) -> &'static str {
        self.tag().map_or("<empty>", |tag| tag.short_name())
    }
}

impl Keyed for ComponentSlot {
    fn key(&self) -> Option<ResourceId> {
        self.component.id()
    }
}
