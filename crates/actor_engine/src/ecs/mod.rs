//! Actors and components
//!
//! Actors form a transform hierarchy and own their components and children
//! through [`Resource`](crate::foundation::resource::Resource) handles. Every
//! structural change requested during an update is buffered and applied at the
//! owning actor's flush point.

pub mod actor;
pub mod component;
pub mod components;
pub mod context;
pub(crate) mod deferred;
pub mod entity;

#[cfg(test)]
mod tests;

pub use actor::{Actor, ActorBehavior, ActorCore, Reparent};
pub use component::Component;
pub use context::ActorCtx;
pub use entity::{ActorId, SceneId};
