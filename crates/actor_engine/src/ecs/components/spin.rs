//! Constant rotation

use crate::ecs::component::Component;
use crate::ecs::context::ActorCtx;
use crate::foundation::math::{Quat, Vec3};
use crate::scene::serialization::ComponentRecord;
use serde::{Deserialize, Serialize};

/// Rotates its actor at a constant angular velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    /// Rotation axis scaled by speed, in radians per second (local space)
    pub angular_velocity: Vec3,
}

impl Spin {
    /// Spin around `axis` at `radians_per_second`
    pub fn new(axis: Vec3, radians_per_second: f32) -> Self {
        let axis = axis.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::zeros);
        Self {
            angular_velocity: axis * radians_per_second,
        }
    }
}

impl Component for Spin {
    fn update(&mut self, actor: &mut ActorCtx<'_>) {
        let step = Quat::from_scaled_axis(self.angular_velocity * actor.delta_time());
        let transform = actor.transform_mut();
        transform.rotation = transform.rotation * step;
    }

    fn record(&self) -> Option<ComponentRecord> {
        Some(ComponentRecord::Spin(*self))
    }
}
