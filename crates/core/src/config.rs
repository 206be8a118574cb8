//! Viewer configuration
//!
//! All tunables for layout, visibility tracking and render scheduling live in
//! one struct. Configuration can be loaded from a JSON file, environment
//! variables, or created programmatically.

use crate::layout::LayoutMode;
use crate::visibility::TrackerConfig;
use pagestream_scheduler::{SchedulerConfig, MODE_SWITCH_RECENTER_DELAY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Largest accepted batch size for either pass
pub const MAX_CONCURRENCY: usize = 64;

/// Largest accepted timer value in milliseconds
pub const MAX_TIMER_MS: u64 = 60_000;

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("Invalid value for configuration key: {0}")]
    InvalidValue(String),

    /// I/O error reading or writing configuration file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed configuration document
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for a viewing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Stacking axis
    pub layout_mode: LayoutMode,
    /// Display scale (zoom) applied to natural dimensions
    pub scale: f64,
    /// Extra visibility window on each side, in viewport extents
    pub buffer_multiplier: f64,
    /// Fast-pass render scale at zoom 1.0
    pub fast_scale: f32,
    /// Quality-pass render scale
    pub quality_scale: f32,
    /// Fast-pass batch size
    pub concurrency_cap_fast: usize,
    /// Quality-pass batch size
    pub concurrency_cap_quality: usize,
    /// Visibility settle window in milliseconds
    pub settle_window_ms: u64,
    /// Minimum spacing between immediate visibility commits in milliseconds
    pub commit_cooldown_ms: u64,
    /// Quiet period before the quality pass in milliseconds
    pub quality_upgrade_delay_ms: u64,
    /// Scratch rasters kept for reuse
    pub canvas_pool_size: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            layout_mode: LayoutMode::Vertical,
            scale: 1.0,
            buffer_multiplier: 1.0,
            fast_scale: 1.0,
            quality_scale: 2.0,
            concurrency_cap_fast: 4,
            concurrency_cap_quality: 2,
            settle_window_ms: 120,
            commit_cooldown_ms: 500,
            quality_upgrade_delay_ms: 600,
            canvas_pool_size: 6,
        }
    }
}

impl ViewerConfig {
    /// Sets the layout mode.
    pub fn with_layout_mode(mut self, mode: LayoutMode) -> Self {
        self.layout_mode = mode;
        self
    }

    /// Sets the display scale.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the visibility buffer multiplier.
    pub fn with_buffer_multiplier(mut self, multiplier: f64) -> Self {
        self.buffer_multiplier = multiplier;
        self
    }

    /// Sets the fast and quality render scales.
    pub fn with_render_scales(mut self, fast: f32, quality: f32) -> Self {
        self.fast_scale = fast;
        self.quality_scale = quality;
        self
    }

    /// Sets the fast and quality batch sizes.
    pub fn with_concurrency(mut self, fast: usize, quality: usize) -> Self {
        self.concurrency_cap_fast = fast;
        self.concurrency_cap_quality = quality;
        self
    }

    /// Sets the canvas pool size.
    pub fn with_canvas_pool_size(mut self, size: usize) -> Self {
        self.canvas_pool_size = size;
        self
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn commit_cooldown(&self) -> Duration {
        Duration::from_millis(self.commit_cooldown_ms)
    }

    pub fn quality_upgrade_delay(&self) -> Duration {
        Duration::from_millis(self.quality_upgrade_delay_ms)
    }

    /// Checks every value is usable.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;

        if !positive(self.scale) {
            return Err(ConfigError::InvalidValue("scale".to_string()));
        }
        if !(self.buffer_multiplier.is_finite() && self.buffer_multiplier >= 0.0) {
            return Err(ConfigError::InvalidValue("buffer_multiplier".to_string()));
        }
        if !positive(self.fast_scale as f64) {
            return Err(ConfigError::InvalidValue("fast_scale".to_string()));
        }
        if !positive(self.quality_scale as f64) || self.quality_scale < self.fast_scale {
            return Err(ConfigError::InvalidValue("quality_scale".to_string()));
        }
        let cap = |v: usize| (1..=MAX_CONCURRENCY).contains(&v);
        if !cap(self.concurrency_cap_fast) {
            return Err(ConfigError::InvalidValue("concurrency_cap_fast".to_string()));
        }
        if !cap(self.concurrency_cap_quality) {
            return Err(ConfigError::InvalidValue("concurrency_cap_quality".to_string()));
        }

        let timers = [
            ("settle_window_ms", self.settle_window_ms),
            ("commit_cooldown_ms", self.commit_cooldown_ms),
            ("quality_upgrade_delay_ms", self.quality_upgrade_delay_ms),
        ];
        if let Some((key, _)) = timers.iter().find(|(_, ms)| *ms > MAX_TIMER_MS) {
            return Err(ConfigError::InvalidValue(key.to_string()));
        }
        Ok(())
    }

    /// Scheduler settings derived from this configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            fast_scale: self.fast_scale,
            quality_scale: self.quality_scale,
            concurrency_cap_fast: self.concurrency_cap_fast,
            concurrency_cap_quality: self.concurrency_cap_quality,
            settle_window: self.settle_window(),
            quality_upgrade_delay: self.quality_upgrade_delay(),
            canvas_pool_size: self.canvas_pool_size,
        }
    }

    /// Visibility tracker settings derived from this configuration.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            buffer_multiplier: self.buffer_multiplier,
            settle_window: self.settle_window(),
            commit_cooldown: self.commit_cooldown(),
            recenter_delay: MODE_SWITCH_RECENTER_DELAY,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables (unset ones keep their defaults):
    /// - `PAGESTREAM_LAYOUT_MODE`: `vertical`, `horizontal` or `single_row`
    /// - `PAGESTREAM_SCALE`
    /// - `PAGESTREAM_BUFFER_MULTIPLIER`
    /// - `PAGESTREAM_FAST_SCALE`
    /// - `PAGESTREAM_QUALITY_SCALE`
    /// - `PAGESTREAM_CONCURRENCY_FAST`
    /// - `PAGESTREAM_CONCURRENCY_QUALITY`
    /// - `PAGESTREAM_SETTLE_WINDOW_MS`
    /// - `PAGESTREAM_COMMIT_COOLDOWN_MS`
    /// - `PAGESTREAM_QUALITY_DELAY_MS`
    /// - `PAGESTREAM_CANVAS_POOL_SIZE`
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        env_override("PAGESTREAM_LAYOUT_MODE", &mut config.layout_mode)?;
        env_override("PAGESTREAM_SCALE", &mut config.scale)?;
        env_override("PAGESTREAM_BUFFER_MULTIPLIER", &mut config.buffer_multiplier)?;
        env_override("PAGESTREAM_FAST_SCALE", &mut config.fast_scale)?;
        env_override("PAGESTREAM_QUALITY_SCALE", &mut config.quality_scale)?;
        env_override("PAGESTREAM_CONCURRENCY_FAST", &mut config.concurrency_cap_fast)?;
        env_override("PAGESTREAM_CONCURRENCY_QUALITY", &mut config.concurrency_cap_quality)?;
        env_override("PAGESTREAM_SETTLE_WINDOW_MS", &mut config.settle_window_ms)?;
        env_override("PAGESTREAM_COMMIT_COOLDOWN_MS", &mut config.commit_cooldown_ms)?;
        env_override("PAGESTREAM_QUALITY_DELAY_MS", &mut config.quality_upgrade_delay_ms)?;
        env_override("PAGESTREAM_CANVAS_POOL_SIZE", &mut config.canvas_pool_size)?;

        Ok(config)
    }

    /// Parses configuration from a JSON string.
    ///
    /// Missing keys keep their defaults; unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    /// Saves configuration to a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }
}

fn env_override<T: FromStr>(key: &str, slot: &mut T) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var(key) {
        *slot = val
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
    }
    Ok(())
}
