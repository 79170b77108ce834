//! Configuration system
//!
//! Any `serde` type can be loaded from or saved to TOML or RON, picked by file
//! extension. [`EngineConfig`] is the configuration the engine itself reads.

pub use serde::{Deserialize, Serialize};

use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let contents = std::fs::read_to_string(path)?;

        match format {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Load configuration from file, falling back to defaults when it does not exist
    fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is out of range
    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// Scene the engine starts with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    /// Name given to the startup scene
    pub name: String,
    /// RON scene file loaded at startup, if any
    pub startup_file: Option<String>,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            name: "Main".to_string(),
            startup_file: None,
        }
    }
}

/// Frame loop tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Fixed simulation steps per second
    pub fixed_update_hz: u32,
    /// Upper bound on fixed steps run in one frame
    pub max_catch_up_steps: u32,
    /// Stop after this many frames (unbounded when `None`)
    pub max_frames: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            fixed_update_hz: 60,
            max_catch_up_steps: 5,
            max_frames: None,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Startup scene
    pub scene: SceneSettings,
    /// Frame loop
    #[serde(rename = "loop")]
    pub frame_loop: LoopSettings,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            scene: SceneSettings::default(),
            frame_loop: LoopSettings::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the startup scene name
    pub fn with_scene_name(mut self, name: impl Into<String>) -> Self {
        self.scene.name = name.into();
        self
    }

    /// Load a scene file at startup
    pub fn with_startup_file(mut self, path: impl Into<String>) -> Self {
        self.scene.startup_file = Some(path.into());
        self
    }

    /// Set fixed steps per second
    pub fn with_fixed_update_hz(mut self, hz: u32) -> Self {
        self.frame_loop.fixed_update_hz = hz;
        self
    }

    /// Stop after `frames` frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.frame_loop.max_frames = Some(frames);
        self
    }

    /// Length of one fixed step in seconds
    pub fn fixed_step_seconds(&self) -> f32 {
        1.0 / self.frame_loop.fixed_update_hz.max(1) as f32
    }

    /// Check that values are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_loop.fixed_update_hz == 0 {
            return Err(ConfigError::Invalid("loop.fixed_update_hz must be > 0".to_string()));
        }
        if self.frame_loop.max_catch_up_steps == 0 {
            return Err(ConfigError::Invalid(
                "loop.max_catch_up_steps must be > 0".to_string(),
            ));
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            log_level = "debug"

            [loop]
            max_frames = 10
            "#,
        )
        .expect("valid TOML");

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.frame_loop.max_frames, Some(10));
        assert_eq!(config.frame_loop.fixed_update_hz, 60);
        assert_eq!(config.scene.name, "Main");
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let config = EngineConfig::new().with_fixed_update_hz(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(EngineConfig::new().validate().is_ok());
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let result = EngineConfig::load_from_file("engine.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_ron_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("actor_engine_config_{}.ron", std::process::id()));
        let config = EngineConfig::new().with_scene_name("Arena").with_max_frames(3);
        config.save_to_file(&path).expect("save");
        let loaded = EngineConfig::load_from_file(&path).expect("load");
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
