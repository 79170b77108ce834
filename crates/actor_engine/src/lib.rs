//! # Actor Engine
//!
//! Scene graph core for a real-time 3D engine: single-owner resources with weak
//! observers, actors with components, and a scene that updates and renders the
//! tree while buffering every structural change until a safe flush point.
//!
//! ## Features
//!
//! - **Ownership**: [`Resource`](foundation::resource::Resource) owns, [`Ref`](foundation::resource::Ref)
//!   observes and reports when the value is gone
//! - **Actors and components**: transform hierarchy with deferred add/destroy
//! - **Scenes**: ordered update/render traversal, UUID lookup, death broadcast
//! - **Serialization**: RON scene documents with post-load re-linking
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use actor_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let ship = engine.scene_mut().spawn_actor("Ship");
//!         ship.with_mut(|ship| ship.add_component(Spin::new(Vec3::y(), 1.0)))
//!             .map_err(|e| AppError::Custom(e.to_string()))?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default().with_max_frames(60);
//!     let mut app = MyApp;
//!     Engine::run(config, &mut app)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod ecs;
pub mod events;
pub mod foundation;
pub mod scene;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError, FrameStats};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, EngineConfig},
        ecs::{
            components::{Lifetime, LightSource, LookAt, MeshRenderer, Spin},
            Actor, ActorBehavior, ActorCtx, ActorId, Component, Reparent,
        },
        events::{ActorDestroyed, Signal},
        foundation::{
            math::{Mat4, Quat, Transform, Vec3},
            resource::{make_owned, Ref, Resource, ResourceError},
            time::{FixedStep, Timer},
        },
        scene::{
            render_queue::RenderSink, RenderContext, RenderItem, RenderQueue, Scene, SceneBehavior,
            SceneError,
        },
        AppError, Application, Engine, EngineError,
    };
}
