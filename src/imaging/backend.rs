//! Image codec trait and the in-memory image types it works with.
//!
//! The [`ImageCodec`] trait covers the three encode/decode operations the
//! store needs: decode a stored half, encode a half or still composite as
//! JPEG, and encode an [`Animation`] as a looping GIF.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), built on the `image` crate.

use super::params::Quality;
use crate::types::ViewingMethod;
use image::DynamicImage;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Invalid image geometry: {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },
    #[error("Invalid thumbnail size: {size}px with a {border}px border")]
    InvalidThumbnailSize { size: u32, border: u32 },
    #[error("Viewing method not implemented: {0}")]
    NotImplemented(ViewingMethod),
    #[error("Codec failure: {0}")]
    Codec(String),
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::Codec(err.to_string())
    }
}

/// A decoded image plus the pixel scale factor it was captured at.
///
/// The scale is carried so that halves taken on different displays are never
/// silently composed together. Freshly decoded JPEGs have scale 1 unless the
/// record's property list says otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pixels: DynamicImage,
    scale: u32,
}

impl Photo {
    pub fn new(pixels: DynamicImage) -> Self {
        Self::with_scale(pixels, 1)
    }

    pub fn with_scale(pixels: DynamicImage, scale: u32) -> Self {
        Self {
            pixels,
            scale: scale.max(1),
        }
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> DynamicImage {
        self.pixels
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }
}

/// A cyclic frame sequence that loops indefinitely.
///
/// Every frame shares the same canvas size.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    frames: Vec<Photo>,
    frame_delay: Duration,
}

impl Animation {
    pub(crate) fn new(frames: Vec<Photo>, frame_delay: Duration) -> Self {
        Self {
            frames,
            frame_delay,
        }
    }

    pub fn frames(&self) -> &[Photo] {
        &self.frames
    }

    /// How long each frame is shown.
    pub fn frame_delay(&self) -> Duration {
        self.frame_delay
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.frames
            .first()
            .map(Photo::dimensions)
            .unwrap_or((0, 0))
    }
}

/// Result of combining two halves under a viewing method.
#[derive(Debug, Clone, PartialEq)]
pub enum Composite {
    Still(Photo),
    Animated(Animation),
}

impl Composite {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Composite::Still(photo) => photo.dimensions(),
            Composite::Animated(animation) => animation.dimensions(),
        }
    }

    /// The still image, or the first frame of an animation.
    pub fn poster_frame(&self) -> Option<&Photo> {
        match self {
            Composite::Still(photo) => Some(photo),
            Composite::Animated(animation) => animation.frames().first(),
        }
    }
}

/// Encode/decode operations the store relies on.
///
/// Implementations must be `Send + Sync`: records move between the capture
/// worker and the interactive thread, and both halves may be decoded in
/// parallel.
pub trait ImageCodec: Send + Sync {
    /// Decode any supported still format (JPEG at minimum).
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError>;

    /// Encode as baseline JPEG at the given quality.
    fn encode_jpeg(&self, image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, ImageError>;

    /// Encode as an infinitely looping GIF.
    fn encode_gif(&self, animation: &Animation) -> Result<Vec<u8>, ImageError>;
}
