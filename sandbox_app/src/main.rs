//! Scene demo application
//!
//! Builds a small asteroid field, lets it run for a bounded number of frames
//! and logs what the scene does: spawns, expirations and per-frame draw counts.
//!
//! Usage: `scene_demo [config.toml] [save.ron]`

use actor_engine::foundation::logging;
use actor_engine::prelude::*;
use actor_engine::scene::serialization;
use rand::Rng;
use std::cell::Cell;
use std::rc::Rc;
use thiserror::Error;

const ROCK_COUNT: usize = 12;
const FIELD_RADIUS: f32 = 40.0;
const DEBRIS_INTERVAL: f32 = 0.25;

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Spawns short-lived debris around its actor at a fixed interval
struct DebrisEmitter {
    cooldown: f32,
    spawned: u32,
}

impl ActorBehavior for DebrisEmitter {
    fn update(&mut self, actor: &mut ActorCtx<'_>) {
        self.cooldown -= actor.delta_time();
        if self.cooldown > 0.0 {
            return;
        }
        self.cooldown += DEBRIS_INTERVAL;
        self.spawned += 1;

        let mut rng = rand::thread_rng();
        let origin = actor.world_transform().position;
        let offset = Vec3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), 0.0);
        let debris = Actor::with_transform(
            format!("Debris{}", self.spawned),
            Transform::from_position(origin + offset),
        );
        if let Some(mut node) = debris.get_mut() {
            node.add_component(MeshRenderer::new("debris", "rock"));
            node.add_component(Spin::new(Vec3::z(), rng.gen_range(1.0..4.0)));
            node.add_component(Lifetime::new(rng.gen_range(0.5..1.5)));
        }
        actor.add_actor(debris);
    }
}

struct SceneDemo {
    save_to: Option<String>,
    destroyed: Rc<Cell<u32>>,
}

impl SceneDemo {
    fn populate(scene: &mut Scene) -> Result<(), ResourceError> {
        let mut rng = rand::thread_rng();

        let sun = scene.spawn_actor("Sun");
        sun.with_mut(|sun| {
            sun.add_component(LightSource::directional(
                Vec3::new(-0.3, -1.0, -0.2),
                Vec3::new(1.0, 0.95, 0.9),
                1.2,
            ));
        })?;

        let ship = scene.spawn_actor_with("Ship", Transform::from_position(Vec3::zeros()));
        ship.with_mut(|ship| {
            ship.add_component(MeshRenderer::new("ship", "hull"));
            ship.set_behavior(DebrisEmitter {
                cooldown: DEBRIS_INTERVAL,
                spawned: 0,
            });
        })?;

        let mut first_rock = None;
        for index in 0..ROCK_COUNT {
            let position = Vec3::new(
                rng.gen_range(-FIELD_RADIUS..FIELD_RADIUS),
                rng.gen_range(-FIELD_RADIUS..FIELD_RADIUS),
                rng.gen_range(-5.0..5.0),
            );
            let scale = rng.gen_range(0.5..3.0);
            let rock = scene.spawn_actor_with(
                format!("Asteroid{}", index),
                Transform::from_position(position).with_uniform_scale(scale),
            );
            let axis = Vec3::new(rng.gen(), rng.gen(), rng.gen());
            rock.with_mut(|rock| {
                rock.add_component(MeshRenderer::new("asteroid", "rock"));
                rock.add_component(Spin::new(axis, rng.gen_range(0.2..1.5)));
            })?;
            if first_rock.is_none() {
                first_rock = Some(rock);
            }
        }

        // a turret on the ship that tracks the first asteroid
        let turret = Actor::with_transform("Turret", Transform::from_position(Vec3::new(0.0, 1.0, 0.0)));
        if let (Some(mut node), Some(target)) = (turret.get_mut(), first_rock.as_ref()) {
            node.add_component(MeshRenderer::new("turret", "hull"));
            node.add_component(LookAt::at(target));
        }
        ship.with_mut(|ship| ship.add_child_actor(turret))?;
        Ok(())
    }
}

impl Application for SceneDemo {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        let scene = engine.scene_mut();
        if scene.actors().is_empty() && scene.pending_actors().is_empty() {
            log::info!("Populating '{}' with a generated field", scene.name());
            Self::populate(scene).map_err(|e| AppError::Custom(e.to_string()))?;
        }

        let destroyed = Rc::clone(&self.destroyed);
        scene.on_actor_destroyed().subscribe(move |event| {
            destroyed.set(destroyed.get() + 1);
            log::debug!("{} ({}) expired", event.name, event.id);
        });
        Ok(())
    }

    fn render(&mut self, engine: &mut Engine, frame: &RenderQueue) -> Result<(), AppError> {
        if engine.frame_count() % 60 == 0 {
            log::info!(
                "Frame {}: {} draw(s) in {} batch(es), {} light(s), {} actor(s), {} destroyed",
                engine.frame_count(),
                frame.draw_count(),
                frame.opaque_batches().len(),
                frame.lights().len(),
                engine.scene().actors().len(),
                self.destroyed.get()
            );
        }
        Ok(())
    }

    fn cleanup(&mut self, engine: &mut Engine) {
        let Some(path) = self.save_to.as_deref() else {
            return;
        };
        match serialization::save_file(engine.scene(), path) {
            Ok(()) => log::info!("Saved scene to {}", path),
            Err(e) => log::error!("Failed to save scene to {}: {}", path, e),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "scene_demo.toml".to_string());
    let save_to = args.next();

    run(&config_path, save_to).map_err(|e| {
        log::error!("Scene demo failed: {}", e);
        e.into()
    })
}

fn run(config_path: &str, save_to: Option<String>) -> Result<(), DemoError> {
    let mut config = EngineConfig::load_or_default(config_path)?;
    if config.frame_loop.max_frames.is_none() {
        config.frame_loop.max_frames = Some(600);
    }
    logging::init_with_level(logging::parse_level(&config.log_level));
    log::info!("Starting scene demo with {:?}", config);

    let mut app = SceneDemo {
        save_to,
        destroyed: Rc::new(Cell::new(0)),
    };
    Engine::run(config, &mut app)?;
    Ok(())
}
