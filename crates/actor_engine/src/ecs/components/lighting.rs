//! Light source component
//!
//! Lights are authored in the owning actor's local space and converted to
//! world space at submission time, so moving or rotating the actor moves the
//! light with it.

use crate::ecs::component::Component;
use crate::foundation::math::{Transform, Vec3};
use crate::scene::render_queue::{LightData, LightShape, RenderContext, RenderItem, RenderSink};
use crate::scene::serialization::ComponentRecord;
use serde::{Deserialize, Serialize};

/// Types of lights supported by the renderer boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LightType {
    /// Directional light (like sunlight) with parallel rays along a local direction
    Directional {
        /// Direction in the actor's local space
        direction: Vec3,
    },
    /// Point light that radiates in all directions from the actor's position
    Point {
        /// Maximum range
        range: f32,
    },
}

/// Light attached to an actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightSource {
    /// The type of light
    pub light_type: LightType,
    /// RGB color values for the light (0.0 to 1.0 range)
    pub color: Vec3,
    /// Light intensity multiplier
    pub intensity: f32,
    /// Whether the light is currently enabled
    pub enabled: bool,
}

impl LightSource {
    /// Directional light; `direction` need not be normalized
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional {
                direction: direction.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::y()),
            },
            color,
            intensity,
            enabled: true,
        }
    }

    /// Point light at the actor's origin
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Point { range },
            color,
            intensity,
            enabled: true,
        }
    }

    /// World-space light parameters for an actor at `frame`
    pub fn shape_in(&self, frame: &RenderContext<'_>) -> LightShape {
        match self.light_type {
            LightType::Directional { direction } => {
                let world = Transform::from_matrix(frame.world);
                let direction = (world.rotation * direction)
                    .try_normalize(f32::EPSILON)
                    .unwrap_or(direction);
                LightShape::Directional { direction }
            }
            LightType::Point { range } => LightShape::Point {
                position: frame.world_position(),
                range,
            },
        }
    }
}

impl Component for LightSource {
    fn pre_render(&self, frame: &RenderContext<'_>, sink: &mut dyn RenderSink) {
        if !self.enabled || self.intensity <= 0.0 {
            return;
        }
        sink.submit(RenderItem::Light(LightData {
            actor: frame.actor,
            shape: self.shape_in(frame),
            color: self.color,
            intensity: self.intensity,
        }));
    }

    fn record(&self) -> Option<ComponentRecord> {
        Some(ComponentRecord::Light(self.clone()))
    }
}
