//! Render submission boundary
//!
//! Components never talk to the renderer directly. Their pre-render hook pushes
//! [`RenderItem`]s into a [`RenderSink`]; [`RenderQueue`] is the stock sink that
//! collects a frame's items and batches mesh draws by material.

use crate::ecs::entity::ActorId;
use crate::foundation::math::{Mat4, Vec3};
use std::collections::HashMap;

/// Per-actor data handed to every pre-render hook
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Actor owning the component being rendered
    pub actor: ActorId,
    /// Actor display name
    pub actor_name: &'a str,
    /// Actor world matrix as of the last update
    pub world: &'a Mat4,
}

impl RenderContext<'_> {
    /// World-space position of the actor
    pub fn world_position(&self) -> Vec3 {
        self.world.fixed_view::<3, 1>(0, 3).into_owned()
    }
}

/// A mesh draw request
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDraw {
    /// Actor that submitted the draw
    pub actor: ActorId,
    /// Mesh asset name
    pub mesh: String,
    /// Material asset name
    pub material: String,
    /// World transform matrix
    pub transform: Mat4,
    /// Whether the material needs blending
    pub transparent: bool,
    /// Sort layer (higher renders later)
    pub layer: u8,
}

/// Kind-specific light parameters in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightShape {
    /// Parallel rays along `direction`
    Directional {
        /// Normalized world-space direction
        direction: Vec3,
    },
    /// Omnidirectional light at `position`
    Point {
        /// World-space position
        position: Vec3,
        /// Falloff range
        range: f32,
    },
}

/// A light submitted for this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    /// Actor that submitted the light
    pub actor: ActorId,
    /// Shape and placement
    pub shape: LightShape,
    /// Linear RGB color
    pub color: Vec3,
    /// Intensity multiplier
    pub intensity: f32,
}

/// Anything a component can submit
#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem {
    /// Mesh draw
    Mesh(MeshDraw),
    /// Light
    Light(LightData),
}

/// Input side of the external renderer
pub trait RenderSink {
    /// Accept one item for the current frame
    fn submit(&mut self, item: RenderItem);
}

/// Draws sharing one material
#[derive(Debug, Clone)]
pub struct RenderBatch<'q> {
    /// Material used by all draws in this batch
    pub material: &'q str,
    /// Draws in submission order
    pub draws: Vec<&'q MeshDraw>,
}

/// Items collected over one frame
#[derive(Debug, Default)]
pub struct RenderQueue {
    opaque: Vec<MeshDraw>,
    transparent: Vec<MeshDraw>,
    lights: Vec<LightData>,
}

impl RenderQueue {
    /// Create an empty render queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Opaque draws in submission order
    pub fn opaque(&self) -> &[MeshDraw] {
        &self.opaque
    }

    /// Transparent draws in submission order
    pub fn transparent(&self) -> &[MeshDraw] {
        &self.transparent
    }

    /// Lights in submission order
    pub fn lights(&self) -> &[LightData] {
        &self.lights
    }

    /// Total number of mesh draws
    pub fn draw_count(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    /// Whether nothing was submitted
    pub fn is_empty(&self) -> bool {
        self.draw_count() == 0 && self.lights.is_empty()
    }

    /// Drop everything for the next frame
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.transparent.clear();
        self.lights.clear();
    }

    /// Sort opaque draws front-to-back and transparent ones back-to-front
    pub fn sort_by_depth(&mut self, camera: &Vec3) {
        let depth = |draw: &MeshDraw| {
            (draw.transform.fixed_view::<3, 1>(0, 3).into_owned() - camera).norm_squared()
        };
        self.opaque.sort_by(|a, b| {
            a.layer
                .cmp(&b.layer)
                .then(depth(a).total_cmp(&depth(b)))
        });
        self.transparent.sort_by(|a, b| {
            a.layer
                .cmp(&b.layer)
                .then(depth(b).total_cmp(&depth(a)))
        });
    }

    /// Opaque draws grouped by material, groups in first-seen order
    pub fn opaque_batches(&self) -> Vec<RenderBatch<'_>> {
        let mut order: Vec<RenderBatch<'_>> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for draw in &self.opaque {
            let slot = *index.entry(draw.material.as_str()).or_insert_with(|| {
                order.push(RenderBatch {
                    material: &draw.material,
                    draws: Vec::new(),
                });
                order.len() - 1
            });
            order[slot].draws.push(draw);
        }
        order
    }
}

impl RenderSink for RenderQueue {
    fn submit(&mut self, item: RenderItem) {
        match item {
            RenderItem::Mesh(draw) if draw.transparent => self.transparent.push(draw),
            RenderItem::Mesh(draw) => self.opaque.push(draw),
            RenderItem::Light(light) => self.lights.push(light),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Transform;

    fn draw(material: &str, x: f32, transparent: bool) -> MeshDraw {
        MeshDraw {
            actor: ActorId::from_raw(1),
            mesh: "cube".to_string(),
            material: material.to_string(),
            transform: Transform::from_position(Vec3::new(x, 0.0, 0.0)).to_matrix(),
            transparent,
            layer: 0,
        }
    }

    #[test]
    fn test_render_queue_creation() {
        let queue = RenderQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.draw_count(), 0);
    }

    #[test]
    fn test_submit_splits_by_kind() {
        let mut queue = RenderQueue::new();
        queue.submit(RenderItem::Mesh(draw("stone", 1.0, false)));
        queue.submit(RenderItem::Mesh(draw("glass", 2.0, true)));
        queue.submit(RenderItem::Light(LightData {
            actor: ActorId::from_raw(2),
            shape: LightShape::Point {
                position: Vec3::zeros(),
                range: 5.0,
            },
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
        }));

        assert_eq!(queue.opaque().len(), 1);
        assert_eq!(queue.transparent().len(), 1);
        assert_eq!(queue.lights().len(), 1);

        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_depth_sorting() {
        let mut queue = RenderQueue::new();
        queue.submit(RenderItem::Mesh(draw("a", 10.0, false)));
        queue.submit(RenderItem::Mesh(draw("a", 2.0, false)));
        queue.submit(RenderItem::Mesh(draw("b", 3.0, true)));
        queue.submit(RenderItem::Mesh(draw("b", 9.0, true)));

        queue.sort_by_depth(&Vec3::zeros());
        assert_eq!(queue.opaque()[0].transform[(0, 3)], 2.0);
        assert_eq!(queue.transparent()[0].transform[(0, 3)], 9.0);
    }

    #[test]
    fn test_batches_group_by_material() {
        let mut queue = RenderQueue::new();
        queue.submit(RenderItem::Mesh(draw("stone", 1.0, false)));
        queue.submit(RenderItem::Mesh(draw("metal", 2.0, false)));
        queue.submit(RenderItem::Mesh(draw("stone", 3.0, false)));

        let batches = queue.opaque_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].material, "stone");
        assert_eq!(batches[0].draws.len(), 2);
        assert_eq!(batches[1].material, "metal");
    }
}
