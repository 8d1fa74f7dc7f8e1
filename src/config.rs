use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::{RegionOfInterest, SymbologySet};
use crate::preprocess::MAX_UPSCALE_FACTOR;

/// Scan policy, loadable from TOML
///
/// Defaults describe live scanning: a fixed timeout with no attempt bound.
/// [`ScanConfig::still`] switches to the small retry budget used for photos.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScanConfig {
    /// Symbologies a scan accepts
    #[serde(default)]
    pub symbologies: SymbologySet,
    /// Wall-clock limit of one scan, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// Frames handed to the resolver before giving up; `None` is unbounded
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Extra decode effort on the threshold, sharpen and upscale stages
    #[serde(default = "default_true")]
    pub try_harder: bool,
    /// Column scanning on the threshold, sharpen and upscale stages
    #[serde(default = "default_true")]
    pub try_rotate: bool,
    /// Try the enlarged-grayscale stage
    #[serde(default = "default_true")]
    pub mobile_upscale: bool,
    /// Enlargement of that stage, at most [`MAX_UPSCALE_FACTOR`]
    #[serde(default = "default_upscale_factor")]
    pub upscale_factor: f32,
    /// Crop applied to live frames before preprocessing
    #[serde(default)]
    pub region_of_interest: Option<RegionOfInterest>,
    /// `[capture]` table for live devices
    #[serde(default)]
    pub capture: CaptureSettings,
    /// `[logging]` table
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What the live scanner asks the capture driver for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CaptureSettings {
    /// Requested frame width in pixels
    #[serde(default = "default_capture_width")]
    pub width: u32,
    /// Requested frame height in pixels
    #[serde(default = "default_capture_height")]
    pub height: u32,
    /// Requested frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Ask the driver for continuous autofocus
    #[serde(default)]
    pub autofocus: bool,
}

/// `[logging]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            symbologies: SymbologySet::ALL,
            timeout_secs: default_timeout_secs(),
            max_attempts: None,
            try_harder: true,
            try_rotate: true,
            mobile_upscale: true,
            upscale_factor: default_upscale_factor(),
            region_of_interest: None,
            capture: CaptureSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: default_capture_width(),
            height: default_capture_height(),
            fps: default_fps(),
            autofocus: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ScanConfig {
    /// A handful of retries on one still photo
    pub fn still() -> Self {
        Self {
            timeout_secs: 10.0,
            max_attempts: Some(5),
            ..Self::default()
        }
    }

    /// Camera scanning bounded by wall-clock time only
    pub fn live() -> Self {
        Self::default()
    }

    /// Read and validate a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.to_path_buf(), e))?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text; missing keys take their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    ///
    /// `upscale_factor` must be finite and at most [`MAX_UPSCALE_FACTOR`];
    /// values of 1 or less are accepted and turn the upscale stage off.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.upscale_factor.is_finite() || self.upscale_factor > MAX_UPSCALE_FACTOR {
            return Err(ConfigError::Parse(format!(
                "upscale_factor must be a finite number no larger than {MAX_UPSCALE_FACTOR}, got {}",
                self.upscale_factor
            )));
        }
        if self.timeout_secs.is_nan() {
            return Err(ConfigError::Parse("timeout_secs is not a number".to_string()));
        }
        Ok(())
    }

    /// Negative or non-finite values count as an immediate timeout
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs).unwrap_or(Duration::ZERO)
    }
}

// Default value functions
fn default_timeout_secs() -> f64 {
    30.0
}
fn default_true() -> bool {
    true
}
fn default_upscale_factor() -> f32 {
    1.5
}
fn default_capture_width() -> u32 {
    1280
}
fn default_capture_height() -> u32 {
    720
}
fn default_fps() -> u32 {
    15
}
fn default_log_level() -> String {
    "info".into()
}
