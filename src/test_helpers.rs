//! Shared test utilities for the stereocam test suite.
//!
//! Synthetic photos (no fixture files needed) and an in-memory service
//! bundle whose file system the test keeps a handle on, so it can count
//! reads and writes or inject failures.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let (services, fs) = memory_services("/library");
//! let mut store = PhotoStore::open(Path::new("/library"), services).unwrap();
//! store.create_from_images(gradient_photo(40, 30), gradient_photo(40, 30)).unwrap();
//! assert_eq!(fs.read_count(), 0);
//! ```

use crate::imaging::Photo;
use crate::services::{RecordSettings, Services};
use crate::storage::MemFs;
use image::{DynamicImage, Rgb, RgbImage};
use std::path::Path;
use std::sync::Arc;

// =========================================================================
// Synthetic photos
// =========================================================================

/// RGB photo with a horizontal red and vertical green gradient, so every
/// column differs from its neighbours.
pub fn gradient_photo(width: u32, height: u32) -> Photo {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgb([r, g, 128])
    });
    Photo::new(DynamicImage::ImageRgb8(img))
}

/// Single-colour RGB photo.
pub fn solid_photo(width: u32, height: u32, rgb: [u8; 3]) -> Photo {
    Photo::new(DynamicImage::ImageRgb8(RgbImage::from_pixel(
        width,
        height,
        Rgb(rgb),
    )))
}

// =========================================================================
// Services
// =========================================================================

/// Default services over a fresh [`MemFs`] that already contains `root`.
pub fn memory_services(root: impl AsRef<Path>) -> (Services, Arc<MemFs>) {
    let fs = Arc::new(MemFs::with_dir(root));
    let services = Services::with_fs(fs.clone(), RecordSettings::default());
    (services, fs)
}
