//! Pure calculation functions for composite geometry.
//!
//! All functions here are pure and testable without any I/O or images.

/// Widths of the left and right halves when splitting at the horizontal midpoint.
///
/// The left half covers `[0, width / 2)`, the right half `[width / 2, width)`,
/// so for odd widths the extra column goes to the right half.
///
/// # Examples
/// ```
/// # use stereocam::imaging::split_widths;
/// assert_eq!(split_widths(200), (100, 100));
/// assert_eq!(split_widths(201), (100, 101));
/// ```
pub fn split_widths(width: u32) -> (u32, u32) {
    let left = width / 2;
    (left, width - left)
}

/// Canvas size for two images placed side by side, top aligned.
///
/// Width is the sum of both widths, height the taller of the two.
pub fn side_by_side_dimensions(first: (u32, u32), second: (u32, u32)) -> (u32, u32) {
    (first.0 + second.0, first.1.max(second.1))
}

/// Smallest canvas that holds every frame anchored at the top-left corner.
pub fn canvas_dimensions(frames: &[(u32, u32)]) -> (u32, u32) {
    frames
        .iter()
        .fold((0, 0), |(w, h), &(fw, fh)| (w.max(fw), h.max(fh)))
}

/// Whether the pixel at `(x, y)` lies inside a `width`×`height` rectangle
/// whose corners are rounded with `radius`.
///
/// Pixel centres are used for the test. The radius is clamped to half the
/// shorter side, so an oversized radius yields a circle or capsule.
pub fn inside_rounded_rect(x: u32, y: u32, width: u32, height: u32, radius: u32) -> bool {
    if x >= width || y >= height {
        return false;
    }
    let r = radius.min(width / 2).min(height / 2) as f64;
    if r == 0.0 {
        return true;
    }

    let px = x as f64 + 0.5;
    let py = y as f64 + 0.5;
    // Nearest point of the inner rectangle that the corner arcs are centred on
    let cx = px.clamp(r, width as f64 - r);
    let cy = py.clamp(r, height as f64 - r);
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= r * r
}
