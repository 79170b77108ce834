//! Core engine implementation
//!
//! The engine owns the active scene and runs the frame loop: a capped number
//! of fixed steps, one variable update, then one render.

use crate::application::Application;
use crate::config::{ConfigError, EngineConfig};
use crate::foundation::time::{FixedStep, Timer};
use crate::scene::render_queue::{RenderQueue, RenderSink};
use crate::scene::{serialization, Scene, SceneError};
use log::{info, warn};
use std::time::Duration;
use thiserror::Error;

/// What happened during one [`Engine::frame`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Fixed steps run this frame
    pub fixed_steps: u32,
    /// Simulation time dropped by the catch-up cap
    pub dropped: Duration,
    /// Variable update delta in seconds
    pub delta_time: f32,
}

/// Main engine struct
///
/// The engine owns the scene and manages the main loop.
pub struct Engine {
    scene: Scene,
    config: EngineConfig,
    timer: Timer,
    fixed: FixedStep,
    frames: u64,
    running: bool,
}

impl Engine {
    /// Create a new engine instance, loading the startup scene if one is configured
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        info!("Initializing engine...");
        config.validate()?;

        let mut scene = Scene::new(config.scene.name.clone());
        if let Some(path) = &config.scene.startup_file {
            let report = serialization::load_file(&mut scene, path)?;
            if !report.is_clean() {
                warn!("Startup scene {} loaded with {} issue(s)", path, report.issues.len());
            }
        }

        let fixed = FixedStep::new(
            Duration::from_secs_f32(config.fixed_step_seconds()),
            config.frame_loop.max_catch_up_steps,
        );

        Ok(Self {
            scene,
            config,
            timer: Timer::new(),
            fixed,
            frames: 0,
            running: true,
        })
    }

    /// Run the engine main loop with the given application
    pub fn run<T: Application>(config: EngineConfig, app: &mut T) -> Result<(), EngineError> {
        let mut engine = Self::new(config)?;

        app.initialize(&mut engine)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {}", e)))?;

        info!("Starting main loop...");
        let mut queue = RenderQueue::new();
        engine.timer = Timer::new();

        while engine.running {
            let elapsed = engine.timer.tick();

            app.update(&mut engine, elapsed.as_secs_f32())
                .map_err(|e| EngineError::ApplicationError(format!("App update: {}", e)))?;

            queue.clear();
            engine.frame(elapsed, &mut queue);

            app.render(&mut engine, &queue)
                .map_err(|e| EngineError::ApplicationError(format!("App render: {}", e)))?;

            if let Some(limit) = engine.config.frame_loop.max_frames {
                if engine.frames >= limit {
                    info!("Reached frame limit ({})", limit);
                    engine.running = false;
                }
            }
        }

        app.cleanup(&mut engine);

        info!("Engine shutdown complete after {} frame(s)", engine.frames);
        Ok(())
    }

    /// Advance the scene by `elapsed` wall time and render it into `sink`
    pub fn frame(&mut self, elapsed: Duration, sink: &mut dyn RenderSink) -> FrameStats {
        let (fixed_steps, dropped) = self.fixed.advance(elapsed);
        if !dropped.is_zero() {
            warn!(
                "Frame {} fell behind; skipping {:.1}ms of fixed updates",
                self.frames,
                dropped.as_secs_f64() * 1000.0
            );
        }

        let step = self.fixed.step().as_secs_f32();
        for _ in 0..fixed_steps {
            self.scene.fixed_update(step);
        }

        let delta_time = elapsed.as_secs_f32();
        self.scene.update(delta_time);
        self.scene.render(sink);
        self.frames += 1;

        FrameStats {
            fixed_steps,
            dropped,
            delta_time,
        }
    }

    /// Request engine shutdown at the end of the current frame
    pub fn quit(&mut self) {
        info!("Engine shutdown requested");
        self.running = false;
    }

    /// Whether the loop keeps going
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Get the active scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Get mutable access to the active scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Swap in a new scene, returning the previous one
    pub fn replace_scene(&mut self, scene: Scene) -> Scene {
        info!("Switching to scene '{}'", scene.name());
        std::mem::replace(&mut self.scene, scene)
    }

    /// Get the engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frames completed so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Get the current frame delta time
    pub fn delta_time(&self) -> f32 {
        self.timer.delta_time()
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Scene error
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Application error
    #[error("Application error: {0}")]
    ApplicationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AppError;
    use crate::scene::SceneBehavior;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountFixed(Rc<Cell<u32>>);

    impl SceneBehavior for CountFixed {
        fn fixed_update(&mut self, _scene: &mut Scene, _step: f32) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_frame_caps_catch_up_steps() {
        let config = EngineConfig::new().with_fixed_update_hz(100);
        let mut engine = Engine::new(config).expect("engine");
        let count = Rc::new(Cell::new(0));
        engine.scene_mut().set_behavior(CountFixed(Rc::clone(&count)));

        let mut queue = RenderQueue::new();
        let stats = engine.frame(Duration::from_secs(1), &mut queue);

        assert_eq!(stats.fixed_steps, 5);
        assert_eq!(count.get(), 5);
        assert!(stats.dropped > Duration::ZERO);
        assert_eq!(engine.scene().ticks(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EngineConfig::new().with_log_level("shouting");
        assert!(matches!(Engine::new(config), Err(EngineError::Config(_))));
    }

    #[derive(Default)]
    struct Recorder {
        initialized: bool,
        updates: u32,
        renders: u32,
        cleaned_up: bool,
    }

    impl Application for Recorder {
        fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
            engine.scene_mut().spawn_actor("Probe");
            self.initialized = true;
            Ok(())
        }

        fn update(&mut self, _engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
            self.updates += 1;
            Ok(())
        }

        fn render(&mut self, _engine: &mut Engine, _frame: &RenderQueue) -> Result<(), AppError> {
            self.renders += 1;
            Ok(())
        }

        fn cleanup(&mut self, engine: &mut Engine) {
            assert_eq!(engine.scene().actors().len(), 1);
            self.cleaned_up = true;
        }
    }

    #[test]
    fn test_run_stops_at_frame_limit() {
        let mut app = Recorder::default();
        Engine::run(EngineConfig::new().with_max_frames(3), &mut app).expect("run");

        assert!(app.initialized);
        assert_eq!(app.updates, 3);
        assert_eq!(app.renders, 3);
        assert!(app.cleaned_up);
    }
}
