//! One captured stereogram and its on-disk directory.
//!
//! ## Layout
//!
//! ```text
//! <root>/<unique-id>/
//! ├── LeftPhoto.jpg
//! ├── RightPhoto.jpg
//! └── Properties.plist
//! ```
//!
//! The three files exist together or not at all: [`StereogramRecord::create`]
//! removes the freshly minted directory again if any write fails, and
//! [`StereogramRecord::load`] refuses a directory missing any of them.
//!
//! ## Caching
//!
//! Every derived artifact lives in its own [`Slot`]: the two decoded halves,
//! the composite and the thumbnail. Slots are filled lazily on first access
//! and emptied only by a viewing-method change (composite + thumbnail),
//! [`StereogramRecord::purge`] (everything, on memory pressure) or deletion.
//! Lookups take `&self`; the cache sits behind a `RefCell` so a record is
//! `Send` but never shared between threads.

use crate::error::{Error, PersistenceError, Result};
use crate::imaging::{Composite, ImageError, Photo, compose, thumbnail};
use crate::properties::Properties;
use crate::services::Services;
use crate::types::{ExportData, RecordId, ViewingMethod};
use image::DynamicImage;
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

pub const LEFT_PHOTO: &str = "LeftPhoto.jpg";
pub const RIGHT_PHOTO: &str = "RightPhoto.jpg";
pub const PROPERTIES_FILE: &str = "Properties.plist";
const SWAP_TEMP: &str = "SwapPhoto.tmp";

/// How many fresh ids to try before giving up on a unique directory name.
const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn file_name(self) -> &'static str {
        match self {
            Side::Left => LEFT_PHOTO,
            Side::Right => RIGHT_PHOTO,
        }
    }
}

/// A lazily materialized artifact.
enum Slot<T> {
    Unloaded,
    Loaded(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Unloaded
    }
}

impl<T: Clone> Slot<T> {
    fn get(&self) -> Option<T> {
        match self {
            Slot::Loaded(value) => Some(value.clone()),
            Slot::Unloaded => None,
        }
    }

    fn is_loaded(&self) -> bool {
        matches!(self, Slot::Loaded(_))
    }
}

#[derive(Default)]
struct ImageCache {
    left: Slot<Arc<Photo>>,
    right: Slot<Arc<Photo>>,
    composite: Slot<Arc<Composite>>,
    thumbnail: Slot<Arc<Photo>>,
}

impl ImageCache {
    fn with_sources(left: Photo, right: Photo) -> Self {
        Self {
            left: Slot::Loaded(Arc::new(left)),
            right: Slot::Loaded(Arc::new(right)),
            ..Self::default()
        }
    }

    fn source(&self, side: Side) -> &Slot<Arc<Photo>> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn set_source(&mut self, side: Side, photo: Arc<Photo>) {
        match side {
            Side::Left => self.left = Slot::Loaded(photo),
            Side::Right => self.right = Slot::Loaded(photo),
        }
    }

    /// Drop everything that depends on the viewing method.
    fn invalidate_derived(&mut self) {
        self.composite = Slot::Unloaded;
        self.thumbnail = Slot::Unloaded;
    }

    fn clear(&mut self) {
        *self = Self::default();
    }

    fn status(&self) -> CacheStatus {
        CacheStatus {
            left: self.left.is_loaded(),
            right: self.right.is_loaded(),
            composite: self.composite.is_loaded(),
            thumbnail: self.thumbnail.is_loaded(),
        }
    }
}

/// Which artifacts are currently held in memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStatus {
    pub left: bool,
    pub right: bool,
    pub composite: bool,
    pub thumbnail: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    OnDisk,
    Deleted,
}

pub struct StereogramRecord {
    id: RecordId,
    base_dir: PathBuf,
    properties: Properties,
    cache: RefCell<ImageCache>,
    lifecycle: Lifecycle,
    services: Services,
}

impl fmt::Debug for StereogramRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StereogramRecord")
            .field("id", &self.id)
            .field("base_dir", &self.base_dir)
            .field("properties", &self.properties)
            .field("cache", &self.cache.borrow().status())
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

impl StereogramRecord {
    /// Persist two fresh halves under a newly minted directory in `root`.
    ///
    /// Both halves are encoded before anything touches the disk. If a write
    /// fails, the new directory is removed again before the error is
    /// returned; a cleanup failure is logged and the original error wins.
    ///
    /// # Panics
    ///
    /// The halves must share the same scale factor.
    pub fn create(left: Photo, right: Photo, root: &Path, services: &Services) -> Result<Self> {
        assert_eq!(
            left.scale(),
            right.scale(),
            "stereogram halves must share the same scale factor"
        );
        if !services.fs.is_dir(root) {
            return Err(Error::InvalidDirectory(root.to_path_buf()));
        }

        let quality = services.settings.jpeg_quality;
        let left_jpeg = services.codec.encode_jpeg(left.pixels(), quality)?;
        let right_jpeg = services.codec.encode_jpeg(right.pixels(), quality)?;
        let properties = Properties::captured_now(left.scale());
        let properties_bytes = properties.to_bytes()?;

        let base_dir = mint_directory(root, services)?;
        let files: [(&str, &[u8]); 3] = [
            (LEFT_PHOTO, &left_jpeg),
            (RIGHT_PHOTO, &right_jpeg),
            (PROPERTIES_FILE, &properties_bytes),
        ];
        for (name, data) in files {
            let path = base_dir.join(name);
            if let Err(err) = services.fs.write(&path, data) {
                discard_directory(&base_dir, services);
                return Err(Error::write_failed(&path, err));
            }
        }

        let id = record_id(&base_dir)?;
        log::info!(
            "event=record_created module=record id={} size={}x{}",
            id,
            left.width(),
            left.height()
        );
        Ok(Self {
            id,
            base_dir,
            properties,
            cache: RefCell::new(ImageCache::with_sources(left, right)),
            lifecycle: Lifecycle::OnDisk,
            services: services.clone(),
        })
    }

    /// Open an existing stereogram directory without decoding any image.
    ///
    /// All three files must be present. An unreadable or corrupt property
    /// list is replaced by defaults (viewing method `Crosseyed`).
    pub fn load(base_dir: &Path, services: &Services) -> Result<Self> {
        if !services.fs.is_dir(base_dir) {
            return Err(Error::InvalidDirectory(base_dir.to_path_buf()));
        }
        for name in [LEFT_PHOTO, RIGHT_PHOTO, PROPERTIES_FILE] {
            let path = base_dir.join(name);
            if !services.fs.exists(&path) {
                return Err(Error::FileNotFound(path));
            }
        }

        let properties_path = base_dir.join(PROPERTIES_FILE);
        let bytes = services
            .fs
            .read(&properties_path)
            .map_err(|e| Error::from_read(&properties_path, e))?;
        let properties = Properties::parse(&bytes, &properties_path).unwrap_or_else(|err| {
            log::warn!(
                "event=properties_defaulted module=record path={} reason={}",
                properties_path.display(),
                err
            );
            Properties::default()
        });

        Ok(Self {
            id: record_id(base_dir)?,
            base_dir: base_dir.to_path_buf(),
            properties,
            cache: RefCell::new(ImageCache::default()),
            lifecycle: Lifecycle::OnDisk,
            services: services.clone(),
        })
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn viewing_method(&self) -> ViewingMethod {
        self.properties.viewing_method
    }

    pub fn date_taken(&self) -> Option<SystemTime> {
        self.properties.date_taken
    }

    pub fn scale(&self) -> u32 {
        self.properties.scale
    }

    pub fn is_deleted(&self) -> bool {
        self.lifecycle == Lifecycle::Deleted
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.cache.borrow().status()
    }

    pub fn photo_path(&self, side: Side) -> PathBuf {
        self.base_dir.join(side.file_name())
    }

    pub fn properties_path(&self) -> PathBuf {
        self.base_dir.join(PROPERTIES_FILE)
    }

    fn ensure_live(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::OnDisk => Ok(()),
            Lifecycle::Deleted => Err(Error::RecordDeleted(self.base_dir.clone())),
        }
    }

    fn read_photo_bytes(&self, side: Side) -> Result<Vec<u8>> {
        let path = self.photo_path(side);
        self.services
            .fs
            .read(&path)
            .map_err(|e| Error::from_read(&path, e))
    }

    /// Wrap decoded pixels with the record's scale, naming the file on failure.
    fn finish_decode(
        &self,
        side: Side,
        decoded: std::result::Result<DynamicImage, ImageError>,
    ) -> Result<Arc<Photo>> {
        decoded
            .map(|pixels| Arc::new(Photo::with_scale(pixels, self.properties.scale)))
            .map_err(|e| Error::InvalidFileFormat {
                path: self.photo_path(side),
                reason: e.to_string(),
            })
    }

    /// One decoded half, from cache or disk.
    pub fn source(&self, side: Side) -> Result<Arc<Photo>> {
        self.ensure_live()?;
        if let Some(photo) = self.cache.borrow().source(side).get() {
            return Ok(photo);
        }

        let bytes = self.read_photo_bytes(side)?;
        let photo = self.finish_decode(side, self.services.codec.decode(&bytes))?;
        log::debug!(
            "event=source_loaded module=record id={} side={:?}",
            self.id,
            side
        );
        self.cache.borrow_mut().set_source(side, Arc::clone(&photo));
        Ok(photo)
    }

    /// Both halves. When neither is cached they are decoded in parallel.
    fn sources(&self) -> Result<(Arc<Photo>, Arc<Photo>)> {
        let status = self.cache_status();
        if status.left || status.right {
            return Ok((self.source(Side::Left)?, self.source(Side::Right)?));
        }

        let left_bytes = self.read_photo_bytes(Side::Left)?;
        let right_bytes = self.read_photo_bytes(Side::Right)?;
        let codec = &self.services.codec;
        let (left, right) = rayon::join(
            || codec.decode(&left_bytes),
            || codec.decode(&right_bytes),
        );

        let left = self.finish_decode(Side::Left, left)?;
        let right = self.finish_decode(Side::Right, right)?;

        let mut cache = self.cache.borrow_mut();
        cache.set_source(Side::Left, Arc::clone(&left));
        cache.set_source(Side::Right, Arc::clone(&right));
        Ok((left, right))
    }

    /// The halves combined under the current viewing method. Cached.
    pub fn composite_image(&self) -> Result<Arc<Composite>> {
        self.ensure_live()?;
        if let Some(composite) = self.cache.borrow().composite.get() {
            log::debug!("event=composite_hit module=record id={}", self.id);
            return Ok(composite);
        }

        let (left, right) = self.sources()?;
        let composite = Arc::new(compose(
            &left,
            &right,
            self.properties.viewing_method,
            self.services.settings.frame_delay,
        )?);
        self.cache.borrow_mut().composite = Slot::Loaded(Arc::clone(&composite));
        Ok(composite)
    }

    /// Square preview derived from the left half, or the right half if the
    /// left one cannot be loaded. Cached.
    pub fn thumbnail_image(&self) -> Result<Arc<Photo>> {
        self.ensure_live()?;
        if let Some(thumb) = self.cache.borrow().thumbnail.get() {
            return Ok(thumb);
        }

        let source = self.source(Side::Left).or_else(|err| {
            log::debug!(
                "event=thumbnail_fallback module=record id={} reason={}",
                self.id,
                err
            );
            self.source(Side::Right)
        })?;
        let settings = &self.services.settings;
        let thumb = Arc::new(thumbnail(
            &source,
            settings.thumbnail_size,
            settings.thumbnail_style,
        )?);
        self.cache.borrow_mut().thumbnail = Slot::Loaded(Arc::clone(&thumb));
        Ok(thumb)
    }

    /// Change the viewing method.
    ///
    /// Setting the current method again does nothing: no disk write, caches
    /// kept. A new method is persisted first; only after the property list
    /// is written are the composite and thumbnail caches dropped.
    pub fn set_viewing_method(&mut self, method: ViewingMethod) -> Result<()> {
        self.ensure_live()?;
        if method == self.properties.viewing_method {
            return Ok(());
        }

        let updated = Properties {
            viewing_method: method,
            ..self.properties
        };
        let path = self.properties_path();
        self.services
            .fs
            .write(&path, &updated.to_bytes()?)
            .map_err(|e| Error::write_failed(&path, e))?;

        self.properties = updated;
        self.cache.get_mut().invalidate_derived();
        log::info!(
            "event=viewing_method_changed module=record id={} method={}",
            self.id,
            method
        );
        Ok(())
    }

    /// Exchange the left and right halves on disk and in the cache.
    ///
    /// Goes through a temporary name. A failed step puts both halves back
    /// under their original names, copying bytes where a rename back fails,
    /// so the directory still loads. A stray temporary file may remain.
    pub fn swap_halves(&mut self) -> Result<()> {
        self.ensure_live()?;
        let left = self.photo_path(Side::Left);
        let right = self.photo_path(Side::Right);
        let temp = self.base_dir.join(SWAP_TEMP);
        let services = &self.services;

        services
            .fs
            .rename(&left, &temp)
            .map_err(|e| Error::write_failed(&left, e))?;
        if let Err(err) = services.fs.rename(&right, &left) {
            move_back(&temp, &left, services);
            return Err(Error::write_failed(&left, err));
        }
        if let Err(err) = services.fs.rename(&temp, &right) {
            move_back(&left, &right, services);
            move_back(&temp, &left, services);
            return Err(Error::write_failed(&right, err));
        }

        let cache = self.cache.get_mut();
        std::mem::swap(&mut cache.left, &mut cache.right);
        cache.invalidate_derived();
        log::info!("event=halves_swapped module=record id={}", self.id);
        Ok(())
    }

    /// The composite serialized for sharing: GIF for animated stereograms,
    /// JPEG otherwise. The MIME type follows the viewing method alone.
    pub fn export_data(&self) -> Result<ExportData> {
        let composite = self.composite_image()?;
        let bytes = match composite.as_ref() {
            Composite::Still(photo) => self
                .services
                .codec
                .encode_jpeg(photo.pixels(), self.services.settings.jpeg_quality)?,
            Composite::Animated(animation) => self.services.codec.encode_gif(animation)?,
        };
        Ok(ExportData {
            bytes,
            mime_type: self.properties.viewing_method.mime_type(),
        })
    }

    /// Remove the whole base directory.
    ///
    /// On failure nothing changes. On success the caches are emptied and
    /// every later image access fails with [`Error::RecordDeleted`].
    pub fn delete_from_disk(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.services
            .fs
            .remove_dir_all(&self.base_dir)
            .map_err(|e| Error::delete_failed(&self.base_dir, e))?;

        self.cache.get_mut().clear();
        self.lifecycle = Lifecycle::Deleted;
        log::info!("event=record_deleted module=record id={}", self.id);
        Ok(())
    }

    /// Drop every cached image; they are recomputed on demand.
    pub fn purge(&self) {
        self.cache.borrow_mut().clear();
    }
}

/// Create a directory under `root` named by a fresh id that is not taken yet.
fn mint_directory(root: &Path, services: &Services) -> Result<PathBuf> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let candidate = root.join(services.ids.next_id());
        if services.fs.exists(&candidate) {
            log::warn!(
                "event=id_collision module=record path={}",
                candidate.display()
            );
            continue;
        }
        match services.fs.create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(Error::write_failed(&candidate, err)),
        }
    }
    Err(PersistenceError::IdCollision {
        attempts: MAX_ID_ATTEMPTS,
    }
    .into())
}

/// Best-effort removal of a half-written record directory.
fn discard_directory(dir: &Path, services: &Services) {
    if let Err(err) = services.fs.remove_dir_all(dir) {
        log::warn!(
            "event=cleanup_failed module=record path={} reason={}",
            dir.display(),
            err
        );
    }
}

/// Undo one rename of a failed swap. Falls back to copying the bytes when
/// the rename itself is refused.
fn move_back(from: &Path, to: &Path, services: &Services) {
    let fs = &services.fs;
    let Err(err) = fs.rename(from, to) else {
        return;
    };
    log::warn!(
        "event=rollback_rename_failed module=record from={} to={} reason={}",
        from.display(),
        to.display(),
        err
    );
    if let Err(err) = fs.read(from).and_then(|bytes| fs.write(to, &bytes)) {
        log::warn!(
            "event=cleanup_failed module=record path={} reason={}",
            to.display(),
            err
        );
    }
}

fn record_id(base_dir: &Path) -> Result<RecordId> {
    base_dir
        .file_name()
        .map(|name| RecordId::new(name.to_string_lossy()))
        .ok_or_else(|| Error::InvalidDirectory(base_dir.to_path_buf()))
}
