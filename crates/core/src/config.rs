//! Startup configuration loaded from TOML.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! working setup.
//!
//! ```toml
//! [window]
//! fullscreen = false
//!
//! [pacing]
//! animation_duration_sec = 3.0
//!
//! [presentation]
//! vsync = false
//! present_throttle_ms = 16
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gsync.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub window: WindowConfig,
    pub pacing: PacingConfig,
    pub presentation: PresentationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    pub title: String,
    /// Size used when `fullscreen` is off.
    pub width: u32,
    pub height: u32,
    /// Borderless fullscreen on the current monitor.
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "G-Sync Test".to_string(),
            width: 1280,
            height: 720,
            fullscreen: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PacingConfig {
    /// Seconds for the bar to cross the screen once.
    pub animation_duration_sec: f64,
    /// Frames per second added or removed by one rate-adjust key press.
    pub rate_step: u32,
    /// Seconds between status reports.
    pub status_interval_sec: f64,
    /// Replaces the monitor-reported refresh rate.
    pub refresh_rate_override: Option<f64>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            animation_duration_sec: 5.0,
            rate_step: 10,
            status_interval_sec: 1.0,
            refresh_rate_override: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PresentationConfig {
    pub vsync: bool,
    /// Whether the display is known to support adaptive sync.
    pub adaptive_sync_available: bool,
    pub adaptive_sync_enabled: bool,
    /// Upper bound for every fence wait, in nanoseconds.
    pub fence_timeout_ns: u64,
    /// Fixed sleep after each present, independent of the oscillator.
    pub present_throttle_ms: Option<u64>,
    /// Enables the Khronos validation layer.
    pub validation: bool,
    /// Directory holding `bar.vert.spv` and `bar.frag.spv`.
    pub shader_dir: PathBuf,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            vsync: true,
            adaptive_sync_available: false,
            adaptive_sync_enabled: false,
            fence_timeout_ns: u64::MAX,
            present_throttle_ms: None,
            validation: cfg!(debug_assertions),
            shader_dir: PathBuf::from("shaders/spirv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: crate::logging::DEFAULT_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(source).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Loads `path` if given, otherwise [`DEFAULT_CONFIG_FILE`] when it exists,
    /// otherwise the defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::load(default_path)
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Checks value ranges that the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        let pacing = &self.pacing;
        if !(pacing.animation_duration_sec.is_finite() && pacing.animation_duration_sec > 0.0) {
            return Err(Error::Config(format!(
                "pacing.animation_duration_sec must be positive, got {}",
                pacing.animation_duration_sec
            )));
        }
        if pacing.rate_step == 0 {
            return Err(Error::Config("pacing.rate_step must be non-zero".into()));
        }
        if !(pacing.status_interval_sec.is_finite() && pacing.status_interval_sec > 0.0) {
            return Err(Error::Config(format!(
                "pacing.status_interval_sec must be positive, got {}",
                pacing.status_interval_sec
            )));
        }
        if let Some(hint) = pacing.refresh_rate_override
            && !(hint.is_finite() && hint > 0.0)
        {
            return Err(Error::Config(format!(
                "pacing.refresh_rate_override must be positive, got {hint}"
            )));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::Config(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if self.presentation.fence_timeout_ns == 0 {
            return Err(Error::Config(
                "presentation.fence_timeout_ns must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
