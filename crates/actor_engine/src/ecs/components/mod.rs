//! Built-in components
//!
//! Each one implements [`Component`](crate::ecs::Component) and has a variant
//! in [`ComponentRecord`](crate::scene::serialization::ComponentRecord) so it
//! survives a save/load cycle.

pub mod lifetime;
pub mod lighting;
pub mod look_at;
pub mod renderable;
pub mod spin;

pub use lifetime::Lifetime;
pub use lighting::{LightSource, LightType};
pub use look_at::LookAt;
pub use renderable::MeshRenderer;
pub use spin::Spin;
