//! Library configuration.
//!
//! Loaded from a single `stereocam.toml`. Every key is optional; a missing
//! file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! library_root = "Stereograms"  # Directory holding one folder per stereogram
//! open_policy = "strict"        # strict | skip-invalid
//!
//! [images]
//! jpeg_quality = 100            # Stored halves and exported JPEGs (1-100)
//!
//! [thumbnails]
//! size = 120                    # Square edge in pixels
//! corner_radius = 0             # Rounded corners, 0 = square
//! border = 0                    # Transparent margin in pixels
//! capacity = 256                # Thumbnails kept in memory
//!
//! [animation]
//! frame_delay_ms = 250          # Per-frame duration of animated stereograms
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::store::OpenPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up next to the library by default.
pub const CONFIG_FILE: &str = "stereocam.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `stereocam.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Root directory of the photo library.
    pub library_root: String,
    /// Whether one malformed stereogram directory fails the whole open.
    pub open_policy: OpenPolicy,
    pub images: ImagesConfig,
    pub thumbnails: ThumbnailsConfig,
    pub animation: AnimationConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            library_root: "Stereograms".to_string(),
            open_policy: OpenPolicy::default(),
            images: ImagesConfig::default(),
            thumbnails: ThumbnailsConfig::default(),
            animation: AnimationConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.library_root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "library_root must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "images.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.thumbnails.size == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.size must be non-zero".into(),
            ));
        }
        if self.thumbnails.border.saturating_mul(2) >= self.thumbnails.size {
            return Err(ConfigError::Validation(
                "thumbnails.border must leave room for the image (2 * border < size)".into(),
            ));
        }
        if self.thumbnails.capacity == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.capacity must be non-zero".into(),
            ));
        }
        if self.animation.frame_delay_ms == 0 {
            return Err(ConfigError::Validation(
                "animation.frame_delay_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// JPEG quality for stored halves and exported composites.
    pub jpeg_quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self { jpeg_quality: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub size: u32,
    pub corner_radius: u32,
    pub border: u32,
    /// Entries kept by the in-memory thumbnail cache.
    pub capacity: usize,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            size: 120,
            corner_radius: 0,
            border: 0,
            capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnimationConfig {
    pub frame_delay_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_delay_ms: 250,
        }
    }
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<StoreConfig, ConfigError> {
    let config: StoreConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// A missing file yields the stock defaults. A present file is parsed,
/// rejects unknown keys, and is validated.
pub fn load_config(path: &Path) -> Result<StoreConfig, ConfigError> {
    if !path.exists() {
        log::debug!(
            "event=config_defaulted module=config path={}",
            path.display()
        );
        return Ok(StoreConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    log::debug!("event=config_loaded module=config path={}", path.display());
    Ok(config)
}

/// Returns a fully-commented stock `stereocam.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Stereocam Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory holding the library: one sub-directory per stereogram.
library_root = "Stereograms"

# What to do when a sub-directory is not a valid stereogram:
#   "strict"       -> refuse to open the library (report the first problem)
#   "skip-invalid" -> log the directory and load everything else
open_policy = "strict"

# ---------------------------------------------------------------------------
# Stored images
# ---------------------------------------------------------------------------
[images]
# JPEG quality for the stored halves and exported still composites (1-100).
jpeg_quality = 100

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Edge of the square thumbnail, in pixels.
size = 120

# Corner rounding radius in pixels. 0 keeps square corners.
corner_radius = 0

# Transparent margin around the thumbnail, in pixels.
border = 0

# How many thumbnails stay in memory before the least recently used is dropped.
capacity = 256

# ---------------------------------------------------------------------------
# Animated stereograms
# ---------------------------------------------------------------------------
[animation]
# How long each of the two frames is shown, in milliseconds.
frame_delay_ms = 250
"##
}
