//! Pure Rust codec built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF first frame) | `image::load_from_memory` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | Encode → looping GIF | `image::codecs::gif::GifEncoder` with `Repeat::Infinite` |

use super::backend::{Animation, ImageCodec, ImageError};
use super::params::Quality;
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::{Delay, DynamicImage, Frame};

/// Codec backed by the `image` crate's pure Rust encoders and decoders.
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec for RustCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError> {
        image::load_from_memory(bytes)
            .map_err(|e| ImageError::Codec(format!("Failed to decode image: {e}")))
    }

    fn encode_jpeg(&self, image: &DynamicImage, quality: Quality) -> Result<Vec<u8>, ImageError> {
        let mut buf = Vec::new();
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
        rgb.write_with_encoder(encoder)
            .map_err(|e| ImageError::Codec(format!("JPEG encode failed: {e}")))?;
        Ok(buf)
    }

    fn encode_gif(&self, animation: &Animation) -> Result<Vec<u8>, ImageError> {
        if animation.frames().is_empty() {
            return Err(ImageError::InvalidGeometry {
                width: 0,
                height: 0,
            });
        }

        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|e| ImageError::Codec(format!("GIF encode failed: {e}")))?;
            let delay = Delay::from_saturating_duration(animation.frame_delay());
            let frames = animation
                .frames()
                .iter()
                .map(|photo| Frame::from_parts(photo.pixels().to_rgba8(), 0, 0, delay));
            encoder
                .encode_frames(frames)
                .map_err(|e| ImageError::Codec(format!("GIF encode failed: {e}")))?;
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Photo;
    use image::codecs::gif::GifDecoder;
    use image::{AnimationDecoder, RgbImage};
    use std::time::Duration;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn jpeg_encode_then_decode_keeps_dimensions() {
        let codec = RustCodec::new();
        let bytes = codec
            .encode_jpeg(&gradient(64, 48), Quality::default())
            .unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn jpeg_encode_drops_alpha() {
        let codec = RustCodec::new();
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::new(8, 8));
        let bytes = codec.encode_jpeg(&rgba, Quality::new(80)).unwrap();
        assert!(codec.decode(&bytes).is_ok());
    }

    #[test]
    fn decode_garbage_is_codec_error() {
        let codec = RustCodec::new();
        let result = codec.decode(b"definitely not a jpeg");
        assert!(matches!(result, Err(ImageError::Codec(_))));
    }

    #[test]
    fn gif_has_two_frames_and_loops() {
        let codec = RustCodec::new();
        let animation = Animation::new(
            vec![Photo::new(gradient(16, 16)), Photo::new(gradient(16, 16))],
            Duration::from_millis(250),
        );
        let bytes = codec.encode_gif(&animation).unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");
        // NETSCAPE2.0 application extension marks an infinitely looping GIF
        assert!(bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));

        let decoder = GifDecoder::new(std::io::Cursor::new(&bytes)).unwrap();
        let frames = decoder.into_frames().collect_frames().unwrap();
        assert_eq!(frames.len(), 2);
        let (numer, denom) = frames[0].delay().numer_denom_ms();
        assert_eq!(numer / denom, 250);
    }

    #[test]
    fn gif_without_frames_is_rejected() {
        let codec = RustCodec::new();
        let animation = Animation::new(Vec::new(), Duration::from_millis(250));
        assert!(matches!(
            codec.encode_gif(&animation),
            Err(ImageError::InvalidGeometry { .. })
        ));
    }
}
