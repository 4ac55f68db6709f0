//! Image processing in pure Rust on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Split halves** | `DynamicImage::crop_imm` at the horizontal midpoint |
//! | **Side by side** | `imageops::replace` onto an RGBA canvas |
//! | **Animate** | two-frame [`Animation`], encoded by `GifEncoder` |
//! | **Thumbnail** | `resize_to_fill` + optional rounded-corner mask |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for composite geometry (unit testable)
//! - **Parameters**: Encoding quality and thumbnail decoration
//! - **Backend**: [`ImageCodec`] trait + [`RustCodec`], and the in-memory image types
//! - **Compositor**: split / compose / thumbnail over [`Photo`]s

pub mod backend;
mod calculations;
pub mod compositor;
mod params;
pub mod rust_backend;

pub use backend::{Animation, Composite, ImageCodec, ImageError, Photo};
pub use calculations::{side_by_side_dimensions, split_widths};
pub use compositor::{DEFAULT_FRAME_DELAY, compose, split_halves, thumbnail};
pub use params::{Quality, ThumbnailStyle};
pub use rust_backend::RustCodec;
