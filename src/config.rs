use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{Container, ModuleSpec, RuntimeOptions, ScaleBounds};
use crate::quiz::RevisitPolicy;
use crate::viewer::ViewerOptions;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("configuration I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse failure: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("configuration YAML parse failure: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub zoom_factor: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub playback_interval_ms: u64,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        let bounds = ScaleBounds::default();
        Self {
            zoom_factor: 1.25,
            min_scale: bounds.min,
            max_scale: bounds.max,
            playback_interval_ms: 500,
            canvas_width: 512,
            canvas_height: 512,
        }
    }
}

impl ViewerSettings {
    pub fn scale_bounds(&self) -> ScaleBounds {
        ScaleBounds {
            min: self.min_scale,
            max: self.max_scale,
        }
    }

    pub fn options(&self) -> ViewerOptions {
        ViewerOptions {
            zoom_factor: self.zoom_factor,
            scale_bounds: self.scale_bounds(),
            playback_interval: Duration::from_millis(self.playback_interval_ms),
            background_loads: false,
        }
    }

    pub fn container(&self, id: impl Into<String>) -> Container {
        Container::new(id, self.canvas_width, self.canvas_height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub modules: Vec<ModuleSpec>,
    pub http_timeout_secs: u64,
    pub max_download_bytes: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        let options = RuntimeOptions::default();
        Self {
            modules: ModuleSpec::default_manifest(),
            http_timeout_secs: options.http_timeout.as_secs(),
            max_download_bytes: options.max_download_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    pub revisit_policy: RevisitPolicy,
    /// Countdown tick period; one tick is one second of question time.
    pub tick_ms: u64,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            revisit_policy: RevisitPolicy::Reset,
            tick_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub viewer: ViewerSettings,
    pub runtime: RuntimeSettings,
    pub quiz: QuizSettings,
}

impl AppConfig {
    /// Reads a JSON or YAML (by extension) file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config = if matches!(extension.as_str(), "yaml" | "yml") {
            serde_yaml::from_str::<AppConfig>(&raw)?
        } else {
            serde_json::from_str::<AppConfig>(&raw)?
        };
        config.validate()?;
        log::debug!("configuration loaded from {}", path.display());
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn validate(&self) -> Result<()> {
        let viewer = &self.viewer;
        if !viewer.zoom_factor.is_finite() || viewer.zoom_factor <= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "viewer.zoom_factor must be greater than 1, found {}",
                viewer.zoom_factor
            )));
        }
        if !(viewer.min_scale > 0.0 && viewer.min_scale < viewer.max_scale)
            || !viewer.max_scale.is_finite()
        {
            return Err(ConfigError::Invalid(format!(
                "viewer scale bounds must satisfy 0 < min < max, found {}..{}",
                viewer.min_scale, viewer.max_scale
            )));
        }
        if viewer.playback_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "viewer.playback_interval_ms must be positive".to_string(),
            ));
        }
        if viewer.canvas_width == 0 || viewer.canvas_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "viewer canvas must not be empty, found {}x{}",
                viewer.canvas_width, viewer.canvas_height
            )));
        }
        if self.runtime.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "runtime.http_timeout_secs must be positive".to_string(),
            ));
        }
        if let Some(index) = self
            .runtime
            .modules
            .iter()
            .position(|module| module.name.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "runtime module at index {index} has an empty name"
            )));
        }
        if self.quiz.tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "quiz.tick_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            http_timeout: Duration::from_secs(self.runtime.http_timeout_secs),
            max_download_bytes: self.runtime.max_download_bytes,
            scale_bounds: self.viewer.scale_bounds(),
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.quiz.tick_ms)
    }
}
