//! Mesh renderer component
//!
//! Submits one mesh draw per frame using the owning actor's world transform.
//! Meshes and materials are referred to by asset name; resolving them is the
//! renderer's business.

use crate::ecs::component::Component;
use crate::scene::render_queue::{MeshDraw, RenderContext, RenderItem, RenderSink};
use crate::scene::serialization::ComponentRecord;
use serde::{Deserialize, Serialize};

fn visible_by_default() -> bool {
    true
}

/// Draws a mesh at its actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshRenderer {
    /// Mesh asset name
    pub mesh: String,

    /// Material asset name
    pub material: String,

    /// Whether this mesh is drawn
    #[serde(default = "visible_by_default")]
    pub visible: bool,

    /// Whether this material is transparent (affects render order)
    #[serde(default)]
    pub transparent: bool,

    /// Rendering layer for sorting (higher values render later)
    #[serde(default)]
    pub layer: u8,
}

impl MeshRenderer {
    /// Create a visible, opaque mesh renderer
    pub fn new(mesh: impl Into<String>, material: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            material: material.into(),
            visible: true,
            transparent: false,
            layer: 0,
        }
    }

    /// Mark the material as transparent and put it on `layer`
    pub fn with_transparency(mut self, layer: u8) -> Self {
        self.transparent = true;
        self.layer = layer;
        self
    }

    /// Set visibility
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

impl Component for MeshRenderer {
    fn pre_render(&self, frame: &RenderContext<'_>, sink: &mut dyn RenderSink) {
        if !self.visible {
            return;
        }
        sink.submit(RenderItem::Mesh(MeshDraw {
            actor: frame.actor,
            mesh: self.mesh.clone(),
            material: self.material.clone(),
            transform: *frame.world,
            transparent: self.transparent,
            layer: self.layer,
        }));
    }

    fn record(&self) -> Option<ComponentRecord> {
        Some(ComponentRecord::MeshRenderer(self.clone()))
    }
}
