//! End-to-end library scenarios against the public API.
//!
//! Real-disk scenarios run in a `TempDir` with the production services;
//! failure scenarios use the in-memory file system so deletes can be denied.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use stereocam::imaging::{Composite, Photo, split_halves};
use stereocam::record::{LEFT_PHOTO, PROPERTIES_FILE, RIGHT_PHOTO, StereogramRecord};
use stereocam::services::{RecordSettings, Services};
use stereocam::storage::{FileSystem, MemFs};
use stereocam::store::{OpenPolicy, PhotoStore};
use stereocam::types::ViewingMethod;
use tempfile::TempDir;

fn photo(width: u32, height: u32, shade: u8) -> Photo {
    let img = RgbImage::from_fn(width, height, |x, _| {
        Rgb([shade, (x * 255 / width.max(1)) as u8, 64])
    });
    Photo::new(DynamicImage::ImageRgb8(img))
}

fn local_services() -> Services {
    Services::local(RecordSettings::default())
}

fn memory_store(root: &str) -> (PhotoStore, Arc<MemFs>) {
    let fs = Arc::new(MemFs::with_dir(root));
    let services = Services::with_fs(fs.clone(), RecordSettings::default());
    (PhotoStore::open(Path::new(root), services).unwrap(), fs)
}

fn subdir_count(root: &Path) -> usize {
    fs::read_dir(root)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().is_dir())
        .count()
}

const PROPERTIES_WITHOUT_METHOD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>Version</key>
	<integer>1</integer>
</dict>
</plist>
"#;

// =========================================================================
// Scenario A: empty library
// =========================================================================

#[test]
fn empty_directory_opens_with_no_records() {
    let tmp = TempDir::new().unwrap();
    let store = PhotoStore::open(tmp.path(), local_services()).unwrap();
    assert_eq!(store.count(), 0);
    assert!(store.is_empty());
}

#[test]
fn opening_a_file_is_invalid_directory() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("not-a-dir");
    fs::write(&file, b"x").unwrap();
    let result = PhotoStore::open(&file, local_services());
    assert!(matches!(result, Err(stereocam::Error::InvalidDirectory(_))));
}

// =========================================================================
// Scenario B: existing library, missing ViewingMethod key
// =========================================================================

#[test]
fn existing_records_load_and_default_to_crosseyed() {
    let tmp = TempDir::new().unwrap();
    let services = local_services();
    for _ in 0..2 {
        let record =
            StereogramRecord::create(photo(16, 8, 10), photo(16, 8, 200), tmp.path(), &services)
                .unwrap();
        fs::write(record.properties_path(), PROPERTIES_WITHOUT_METHOD).unwrap();
    }

    let store = PhotoStore::open(tmp.path(), services).unwrap();
    assert_eq!(store.count(), 2);
    for record in &store {
        assert_eq!(record.viewing_method(), ViewingMethod::Crosseyed);
        assert_eq!(record.cache_status(), Default::default());
    }
}

#[test]
fn strict_open_fails_and_lenient_open_skips_broken_folder() {
    let tmp = TempDir::new().unwrap();
    let services = local_services();
    StereogramRecord::create(photo(8, 8, 0), photo(8, 8, 0), tmp.path(), &services).unwrap();
    let broken = tmp.path().join("broken");
    fs::create_dir(&broken).unwrap();
    fs::write(broken.join(LEFT_PHOTO), b"x").unwrap();

    assert!(PhotoStore::open(tmp.path(), services.clone()).is_err());
    let store =
        PhotoStore::open_with_policy(tmp.path(), services, OpenPolicy::SkipInvalid).unwrap();
    assert_eq!(store.count(), 1);
}

// =========================================================================
// Scenario C: create on an empty store
// =========================================================================

#[test]
fn created_record_composites_side_by_side() {
    let tmp = TempDir::new().unwrap();
    let mut store = PhotoStore::open(tmp.path(), local_services()).unwrap();

    let record = store
        .create_from_images(photo(30, 20, 0), photo(30, 20, 255))
        .unwrap();
    let files: Vec<_> = [LEFT_PHOTO, RIGHT_PHOTO, PROPERTIES_FILE]
        .iter()
        .map(|name| record.base_dir().join(name))
        .collect();
    assert!(files.iter().all(|f| f.is_file()));
    assert_eq!(record.base_dir().parent(), Some(tmp.path()));

    assert_eq!(record.composite_image().unwrap().dimensions(), (60, 20));
    assert_eq!(store.count(), 1);

    store.set_viewing_method(0, ViewingMethod::Walleyed).unwrap();
    assert_eq!(
        store.get(0).unwrap().composite_image().unwrap().dimensions(),
        (60, 20)
    );
}

#[test]
fn walleyed_puts_right_half_first() {
    let tmp = TempDir::new().unwrap();
    let mut store = PhotoStore::open(tmp.path(), local_services()).unwrap();
    store
        .create_from_images(photo(10, 10, 0), photo(10, 10, 250))
        .unwrap();
    store.set_viewing_method(0, ViewingMethod::Walleyed).unwrap();

    let composite = store.get(0).unwrap().composite_image().unwrap();
    let Composite::Still(still) = composite.as_ref() else {
        panic!("walleyed composite should be a still image");
    };
    let first_pixel = still.pixels().get_pixel(0, 5).0;
    assert!(first_pixel[0] > 200, "right half (bright) comes first: {first_pixel:?}");
}

#[test]
fn composite_splits_back_into_original_sizes() {
    let tmp = TempDir::new().unwrap();
    let mut store = PhotoStore::open(tmp.path(), local_services()).unwrap();
    let record = store
        .create_from_images(photo(24, 12, 40), photo(24, 12, 90))
        .unwrap();

    let composite = record.composite_image().unwrap();
    let Composite::Still(still) = composite.as_ref() else {
        panic!("crosseyed composite should be a still image");
    };
    let (left, right) = split_halves(still).unwrap();
    assert_eq!(left.dimensions(), (24, 12));
    assert_eq!(right.dimensions(), (24, 12));
}

#[test]
fn n_creates_give_n_unique_children() {
    let tmp = TempDir::new().unwrap();
    let mut store = PhotoStore::open(tmp.path(), local_services()).unwrap();
    for n in 0..5u8 {
        store
            .create_from_images(photo(6, 6, n), photo(6, 6, n))
            .unwrap();
    }
    assert_eq!(store.count(), 5);
    assert_eq!(subdir_count(tmp.path()), 5);

    let reopened = PhotoStore::open(tmp.path(), local_services()).unwrap();
    assert_eq!(reopened.count(), 5);
}

#[test]
fn viewing_method_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let mut store = PhotoStore::open(tmp.path(), local_services()).unwrap();
    store
        .create_from_images(photo(8, 8, 0), photo(8, 8, 0))
        .unwrap();
    store
        .set_viewing_method(0, ViewingMethod::AnimatedGif)
        .unwrap();

    let reopened = PhotoStore::open(tmp.path(), local_services()).unwrap();
    let record = reopened.get(0).unwrap();
    assert_eq!(record.viewing_method(), ViewingMethod::AnimatedGif);
    let export = record.export_data().unwrap();
    assert_eq!(export.mime_type, "image/gif");
    assert!(export.bytes.starts_with(b"GIF"));
}

// =========================================================================
// Scenario D: delete the only record
// =========================================================================

#[test]
fn deleting_only_record_empties_library_and_disk() {
    let tmp = TempDir::new().unwrap();
    let mut store = PhotoStore::open(tmp.path(), local_services()).unwrap();
    store
        .create_from_images(photo(8, 8, 0), photo(8, 8, 0))
        .unwrap();
    assert_eq!(subdir_count(tmp.path()), 1);

    let removed = store.delete_at(0).unwrap();
    assert_eq!(store.count(), 0);
    assert_eq!(subdir_count(tmp.path()), 0);
    assert!(removed.composite_image().is_err());
}

// =========================================================================
// Scenario E: partial batch delete
// =========================================================================

#[test]
fn delete_many_keeps_progress_made_before_failure() {
    let (mut store, fs) = memory_store("/library");
    for n in 0..6u8 {
        store
            .create_from_images(photo(6, 6, n), photo(6, 6, n))
            .unwrap();
    }
    let removed = store.get(1).unwrap().id().clone();
    let kept = store.get(3).unwrap().id().clone();
    fs.deny_delete(store.get(3).unwrap().base_dir());

    assert!(store.delete_many(&[1, 3]).is_err());
    assert_eq!(store.count(), 5);
    assert!(store.position(&removed).is_none());
    assert!(store.position(&kept).is_some());
    assert_eq!(fs.list_dirs(Path::new("/library")).unwrap().len(), 5);
}

#[test]
fn denied_delete_leaves_store_unchanged() {
    let (mut store, fs) = memory_store("/library");
    store
        .create_from_images(photo(6, 6, 0), photo(6, 6, 0))
        .unwrap();
    fs.deny_delete(store.get(0).unwrap().base_dir());

    assert!(store.delete_at(0).is_err());
    assert_eq!(store.count(), 1);
    assert!(fs.exists(store.get(0).unwrap().base_dir()));
}

// =========================================================================
// Caching
// =========================================================================

#[test]
fn second_composite_and_thumbnail_do_no_io() {
    let (mut store, fs) = memory_store("/library");
    store
        .create_from_images(photo(20, 10, 0), photo(20, 10, 0))
        .unwrap();
    let services = store.services().clone();
    let reopened = PhotoStore::open(Path::new("/library"), services).unwrap();
    let record = reopened.get(0).unwrap();

    record.composite_image().unwrap();
    record.thumbnail_image().unwrap();
    let reads = fs.read_count();
    record.composite_image().unwrap();
    record.thumbnail_image().unwrap();
    assert_eq!(fs.read_count(), reads);
}

#[test]
fn same_mode_write_is_skipped_new_mode_invalidates() {
    let (mut store, fs) = memory_store("/library");
    store
        .create_from_images(photo(20, 10, 0), photo(20, 10, 0))
        .unwrap();
    store.get(0).unwrap().composite_image().unwrap();
    store.get(0).unwrap().thumbnail_image().unwrap();

    let writes = fs.write_count();
    store.set_viewing_method(0, ViewingMethod::Crosseyed).unwrap();
    assert_eq!(fs.write_count(), writes);
    assert!(store.get(0).unwrap().cache_status().composite);

    store.set_viewing_method(0, ViewingMethod::Walleyed).unwrap();
    assert_eq!(fs.write_count(), writes + 1);
    let status = store.get(0).unwrap().cache_status();
    assert!(!status.composite && !status.thumbnail);
    assert!(status.left && status.right);
}
