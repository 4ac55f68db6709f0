//! Stereogram compositing: split, recombine, animate, thumbnail.
//!
//! Pure functions over in-memory [`Photo`]s. Nothing here touches the disk or
//! knows about records; [`StereogramRecord`](crate::record::StereogramRecord)
//! decides when to call them and caches the results.

use super::backend::{Animation, Composite, ImageError, Photo};
use super::calculations::{
    canvas_dimensions, inside_rounded_rect, side_by_side_dimensions, split_widths,
};
use super::params::ThumbnailStyle;
use crate::types::ViewingMethod;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use std::time::Duration;

/// Result type for compositor operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// How long each frame of an animated stereogram is shown.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(250);

/// Split a side-by-side image at its horizontal midpoint.
///
/// Left covers `[0, w/2)`, right covers `[w/2, w)`. Images narrower than two
/// pixels or with no rows cannot produce two non-empty halves.
pub fn split_halves(image: &Photo) -> Result<(Photo, Photo)> {
    let (width, height) = image.dimensions();
    if width < 2 || height == 0 {
        return Err(ImageError::InvalidGeometry { width, height });
    }

    let (left_w, right_w) = split_widths(width);
    let left = image.pixels().crop_imm(0, 0, left_w, height);
    let right = image.pixels().crop_imm(left_w, 0, right_w, height);
    Ok((
        Photo::with_scale(left, image.scale()),
        Photo::with_scale(right, image.scale()),
    ))
}

/// Combine two halves according to `method`.
///
/// - `Crosseyed`: `left` then `right`, left to right.
/// - `Walleyed`: `right` then `left`, same canvas.
/// - `AnimatedGif`: two frames alternating `left`, `right`, each shown for
///   `frame_delay`, looping forever.
/// - `RedGreen`, `RandomDot`: [`ImageError::NotImplemented`].
///
/// # Panics
///
/// Both halves must share the same pixel scale factor. Mixing scales is a
/// caller bug, not a recoverable condition.
pub fn compose(
    left: &Photo,
    right: &Photo,
    method: ViewingMethod,
    frame_delay: Duration,
) -> Result<Composite> {
    assert_eq!(
        left.scale(),
        right.scale(),
        "stereogram halves must share the same scale factor"
    );

    match method {
        ViewingMethod::Crosseyed => side_by_side(left, right).map(Composite::Still),
        ViewingMethod::Walleyed => side_by_side(right, left).map(Composite::Still),
        ViewingMethod::AnimatedGif => animate(left, right, frame_delay).map(Composite::Animated),
        ViewingMethod::RedGreen | ViewingMethod::RandomDot => {
            Err(ImageError::NotImplemented(method))
        }
    }
}

fn side_by_side(first: &Photo, second: &Photo) -> Result<Photo> {
    let (width, height) = side_by_side_dimensions(first.dimensions(), second.dimensions());
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidGeometry { width, height });
    }

    let mut canvas = RgbaImage::new(width, height);
    imageops::replace(&mut canvas, &first.pixels().to_rgba8(), 0, 0);
    imageops::replace(
        &mut canvas,
        &second.pixels().to_rgba8(),
        i64::from(first.width()),
        0,
    );
    Ok(Photo::with_scale(
        DynamicImage::ImageRgba8(canvas),
        first.scale(),
    ))
}

fn animate(left: &Photo, right: &Photo, frame_delay: Duration) -> Result<Animation> {
    let (width, height) = canvas_dimensions(&[left.dimensions(), right.dimensions()]);
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidGeometry { width, height });
    }

    let frames = [left, right]
        .into_iter()
        .map(|half| {
            let mut canvas = RgbaImage::new(width, height);
            imageops::replace(&mut canvas, &half.pixels().to_rgba8(), 0, 0);
            Photo::with_scale(DynamicImage::ImageRgba8(canvas), half.scale())
        })
        .collect();
    Ok(Animation::new(frames, frame_delay))
}

/// Square thumbnail: aspect-fill scale, centre crop to `size`×`size`.
///
/// With a non-default [`ThumbnailStyle`] the image is inset by `border`
/// transparent pixels and its corners are rounded by `corner_radius`.
/// Deterministic for identical input.
pub fn thumbnail(image: &Photo, size: u32, style: ThumbnailStyle) -> Result<Photo> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidGeometry { width, height });
    }
    if size == 0 || style.border.saturating_mul(2) >= size {
        return Err(ImageError::InvalidThumbnailSize {
            size,
            border: style.border,
        });
    }

    let inner = size - 2 * style.border;
    let filled = image
        .pixels()
        .resize_to_fill(inner, inner, FilterType::Lanczos3);

    if style == ThumbnailStyle::default() {
        return Ok(Photo::with_scale(filled, image.scale()));
    }

    let mut face = filled.to_rgba8();
    if style.corner_radius > 0 {
        for (x, y, pixel) in face.enumerate_pixels_mut() {
            if !inside_rounded_rect(x, y, inner, inner, style.corner_radius) {
                pixel.0[3] = 0;
            }
        }
    }

    let mut canvas = RgbaImage::new(size, size);
    imageops::replace(
        &mut canvas,
        &face,
        i64::from(style.border),
        i64::from(style.border),
    );
    Ok(Photo::with_scale(
        DynamicImage::ImageRgba8(canvas),
        image.scale(),
    ))
}
