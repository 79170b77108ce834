//! Look-at component
//!
//! Keeps its actor's -Z axis pointed at another actor. The target is saved by
//! identity and re-linked through [`Scene::get_actor`] after a load, since the
//! target may not exist yet when this component is created.

use crate::ecs::actor::Actor;
use crate::ecs::component::Component;
use crate::ecs::context::ActorCtx;
use crate::ecs::entity::ActorId;
use crate::foundation::math::{utils, Transform, Vec3};
use crate::foundation::resource::Ref;
use crate::scene::serialization::ComponentRecord;
use crate::scene::Scene;
use log::warn;
use serde::{Deserialize, Serialize};

fn default_up() -> Vec3 {
    Vec3::y()
}

/// Rotates its actor toward a target actor every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookAt {
    /// Identity of the target actor
    pub target: Option<ActorId>,

    /// World-space up hint
    #[serde(default = "default_up")]
    pub up: Vec3,

    #[serde(skip)]
    target_ref: Ref<Actor>,

    #[serde(skip)]
    reported: bool,
}

impl LookAt {
    /// Look at the actor with identity `target` once links are resolved
    pub fn new(target: ActorId) -> Self {
        Self {
            target: Some(target),
            up: default_up(),
            target_ref: Ref::invalid(),
            reported: false,
        }
    }

    /// Look at `target` right away
    pub fn at(target: &Ref<Actor>) -> Self {
        let mut look_at = Self {
            target: None,
            up: default_up(),
            target_ref: Ref::invalid(),
            reported: false,
        };
        look_at.set_target(target.clone());
        look_at
    }

    /// Replace the target
    pub fn set_target(&mut self, target: Ref<Actor>) {
        self.target = target.with(Actor::id).ok();
        self.target_ref = target;
        self.reported = false;
    }

    /// Currently linked target
    pub fn target_ref(&self) -> &Ref<Actor> {
        &self.target_ref
    }
}

impl Component for LookAt {
    fn update(&mut self, actor: &mut ActorCtx<'_>) {
        if !self.target_ref.is_valid() {
            return;
        }
        // the parent is mid-update, but its world transform is cached here
        let target = if actor.parent().is_some_and(|p| p.same_as(&self.target_ref)) {
            Transform::from_matrix(actor.parent_world_matrix()).position
        } else {
            match self.target_ref.with(|target| target.world_transform().position) {
                Ok(position) => position,
                Err(error) => {
                    if !self.reported {
                        warn!("'{}' cannot see its target: {}", actor.name(), error);
                        self.reported = true;
                    }
                    return;
                }
            }
        };

        let own = actor.world_transform();
        let Some(world_rotation) = utils::look_rotation(target - own.position, self.up) else {
            return;
        };
        let parent = Transform::from_matrix(actor.parent_world_matrix());
        actor.transform_mut().rotation = parent.rotation.inverse() * world_rotation;
    }

    fn record(&self) -> Option<ComponentRecord> {
        Some(ComponentRecord::LookAt(self.clone()))
    }

    fn resolve_links(&mut self, scene: &Scene) {
        if let Some(id) = self.target {
            self.target_ref = scene.get_actor(id);
        }
    }
}
