//! Parameter types for image operations.
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 100). Clamped on construction.
//! - [`ThumbnailStyle`]: Optional rounded corners and transparent border for thumbnails.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
///
/// Stored halves are written at full quality, so the default is 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// Decoration applied to square thumbnails.
///
/// - `corner_radius`: radius in pixels of the rounded corners (0 = square)
/// - `border`: transparent margin in pixels on every side (0 = none)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThumbnailStyle {
    pub corner_radius: u32,
    pub border: u32,
}
