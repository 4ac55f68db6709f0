//! Collaborators consumed by the core, bundled so records and the store can
//! share them cheaply.

use crate::config::StoreConfig;
use crate::imaging::{DEFAULT_FRAME_DELAY, ImageCodec, Quality, RustCodec, ThumbnailStyle};
use crate::storage::{FileSystem, IdGenerator, LocalFs, UuidGenerator};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Runtime knobs for record persistence and derived images.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSettings {
    /// Quality of stored halves and exported still composites.
    pub jpeg_quality: Quality,
    /// Edge of the square thumbnail in pixels.
    pub thumbnail_size: u32,
    pub thumbnail_style: ThumbnailStyle,
    /// Per-frame duration of animated composites.
    pub frame_delay: Duration,
}

impl RecordSettings {
    /// Build settings from the loaded configuration.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            jpeg_quality: Quality::new(config.images.jpeg_quality),
            thumbnail_size: config.thumbnails.size,
            thumbnail_style: ThumbnailStyle {
                corner_radius: config.thumbnails.corner_radius,
                border: config.thumbnails.border,
            },
            frame_delay: Duration::from_millis(config.animation.frame_delay_ms),
        }
    }
}

impl Default for RecordSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: Quality::default(),
            thumbnail_size: 120,
            thumbnail_style: ThumbnailStyle::default(),
            frame_delay: DEFAULT_FRAME_DELAY,
        }
    }
}

/// File system, image codec and id source shared by every record of a store.
#[derive(Clone)]
pub struct Services {
    pub fs: Arc<dyn FileSystem>,
    pub codec: Arc<dyn ImageCodec>,
    pub ids: Arc<dyn IdGenerator>,
    pub settings: RecordSettings,
}

impl Services {
    /// Real disk, `image`-crate codec, random UUIDs.
    pub fn local(settings: RecordSettings) -> Self {
        Self::with_fs(Arc::new(LocalFs::new()), settings)
    }

    /// Production codec and ids over the given file system.
    pub fn with_fs(fs: Arc<dyn FileSystem>, settings: RecordSettings) -> Self {
        Self {
            fs,
            codec: Arc::new(RustCodec::new()),
            ids: Arc::new(UuidGenerator),
            settings,
        }
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
