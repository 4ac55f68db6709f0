//! The photo library: every stereogram under one root directory.
//!
//! A [`PhotoStore`] mirrors the root's immediate subdirectories as an ordered
//! list of [`StereogramRecord`]s. Order is discovery order at open time
//! (directory names sorted), then insertion order.
//!
//! Mutations go to disk first. The in-memory list only changes after the
//! file system confirmed the change, so a failed delete leaves the record
//! listed and usable.

use crate::error::{Error, Result};
use crate::imaging::{Photo, split_halves};
use crate::record::StereogramRecord;
use crate::services::Services;
use crate::types::{ExportData, RecordId, ViewingMethod};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to do with a subdirectory that is not a valid stereogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenPolicy {
    /// Fail the whole open with the first error.
    #[default]
    Strict,
    /// Log the bad directory and load the rest.
    SkipInvalid,
}

#[derive(Debug)]
pub struct PhotoStore {
    root: PathBuf,
    records: Vec<StereogramRecord>,
    services: Services,
}

impl PhotoStore {
    /// Open the library at `root` with the strict policy.
    pub fn open(root: &Path, services: Services) -> Result<Self> {
        Self::open_with_policy(root, services, OpenPolicy::Strict)
    }

    pub fn open_with_policy(root: &Path, services: Services, policy: OpenPolicy) -> Result<Self> {
        if !services.fs.is_dir(root) {
            return Err(Error::InvalidDirectory(root.to_path_buf()));
        }
        let dirs = services
            .fs
            .list_dirs(root)
            .map_err(|e| Error::from_read(root, e))?;

        let mut records = Vec::with_capacity(dirs.len());
        let mut skipped = 0usize;
        for dir in dirs {
            match StereogramRecord::load(&dir, &services) {
                Ok(record) => records.push(record),
                Err(err) if policy == OpenPolicy::SkipInvalid => {
                    skipped += 1;
                    log::warn!(
                        "event=record_skipped module=store path={} reason={}",
                        dir.display(),
                        err
                    );
                }
                Err(err) => return Err(err),
            }
        }

        log::info!(
            "event=store_opened module=store root={} count={} skipped={}",
            root.display(),
            records.len(),
            skipped
        );
        Ok(Self {
            root: root.to_path_buf(),
            records,
            services,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in library order. The store cannot be mutated while this
    /// borrow is alive.
    pub fn iter(&self) -> std::slice::Iter<'_, StereogramRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[StereogramRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&StereogramRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut StereogramRecord> {
        self.records.get_mut(index)
    }

    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id() == id)
    }

    fn position_of_dir(&self, base_dir: &Path) -> Option<usize> {
        self.records.iter().position(|r| r.base_dir() == base_dir)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.records.len() {
            Ok(())
        } else {
            Err(Error::NoSuchRecord {
                index,
                count: self.records.len(),
            })
        }
    }

    pub(crate) fn check_under_root(&self, record: &StereogramRecord) -> Result<()> {
        if record.base_dir().parent() == Some(self.root.as_path()) {
            Ok(())
        } else {
            Err(Error::OutsideRoot {
                path: record.base_dir().to_path_buf(),
                root: self.root.clone(),
            })
        }
    }

    /// Persist two halves as a new stereogram and append it.
    pub fn create_from_images(&mut self, left: Photo, right: Photo) -> Result<&StereogramRecord> {
        let record = StereogramRecord::create(left, right, &self.root, &self.services)?;
        let index = self.add(record)?;
        Ok(&self.records[index])
    }

    /// Split a side-by-side photo at its midpoint and store the halves.
    pub fn import_side_by_side(&mut self, photo: &Photo) -> Result<&StereogramRecord> {
        let (left, right) = split_halves(photo)?;
        self.create_from_images(left, right)
    }

    /// Append an already persisted record and return its index.
    ///
    /// A record whose base directory is already listed is not added twice;
    /// the existing index is returned. Records living outside the root are
    /// rejected.
    pub fn add(&mut self, record: StereogramRecord) -> Result<usize> {
        self.check_under_root(&record)?;
        if let Some(index) = self.position_of_dir(record.base_dir()) {
            log::debug!(
                "event=duplicate_add module=store id={} index={}",
                record.id(),
                index
            );
            return Ok(index);
        }
        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    /// Delete the record at `index` from disk, then from the list.
    pub fn delete_at(&mut self, index: usize) -> Result<StereogramRecord> {
        self.check_index(index)?;
        self.records[index].delete_from_disk()?;
        Ok(self.records.remove(index))
    }

    pub fn delete(&mut self, id: &RecordId) -> Result<StereogramRecord> {
        let index = self
            .position(id)
            .ok_or_else(|| Error::UnknownRecord(id.clone()))?;
        self.delete_at(index)
    }

    /// Put `record` in place of the one at `index`.
    ///
    /// The old record is deleted from disk first; if that fails nothing
    /// changes. Replacing a record with itself (same base directory) does
    /// nothing. If `record` is already listed at another index, the old entry
    /// is deleted and dropped so the directory stays listed once.
    pub fn replace_at(&mut self, index: usize, record: StereogramRecord) -> Result<()> {
        self.check_index(index)?;
        if self.records[index].base_dir() == record.base_dir() {
            return Ok(());
        }
        self.check_under_root(&record)?;

        self.records[index].delete_from_disk()?;
        match self.position_of_dir(record.base_dir()) {
            Some(_) => {
                self.records.remove(index);
            }
            None => self.records[index] = record,
        }
        Ok(())
    }

    /// Delete several records, in the order given.
    ///
    /// Indices refer to positions before the call. Stops at the first
    /// failure. Records deleted before the failure stay deleted; there is no
    /// rollback, so a failed call may leave the library partially changed.
    /// Returns how many records were deleted.
    pub fn delete_many(&mut self, indices: &[usize]) -> Result<usize> {
        let ids = indices
            .iter()
            .map(|&index| {
                self.check_index(index)
                    .map(|()| self.records[index].id().clone())
            })
            .collect::<Result<Vec<_>>>()?;

        let mut deleted = 0;
        for id in &ids {
            // Repeated indices name a record that is already gone
            if self.position(id).is_none() {
                continue;
            }
            self.delete(id)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// The composite of the record at `index`, ready for sharing.
    pub fn export(&self, index: usize) -> Result<ExportData> {
        self.check_index(index)?;
        self.records[index].export_data()
    }

    pub fn set_viewing_method(&mut self, index: usize, method: ViewingMethod) -> Result<()> {
        self.check_index(index)?;
        self.records[index].set_viewing_method(method)
    }

    /// Drop every cached image of every record.
    pub fn purge_caches(&self) {
        for record in &self.records {
            record.purge();
        }
        log::debug!(
            "event=caches_purged module=store count={}",
            self.records.len()
        );
    }
}

impl<'a> IntoIterator for &'a PhotoStore {
    type Item = &'a StereogramRecord;
    type IntoIter = std::slice::Iter<'a, StereogramRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;
    use crate::record::{LEFT_PHOTO, PROPERTIES_FILE, RIGHT_PHOTO};
    use crate::storage::{FileSystem, MemFs};
    use crate::test_helpers::{gradient_photo, memory_services, solid_photo};
    use std::sync::Arc;

    const ROOT: &str = "/library";

    fn store_with(n: usize) -> (PhotoStore, Arc<MemFs>) {
        let (services, fs) = memory_services(ROOT);
        let mut store = PhotoStore::open(Path::new(ROOT), services).unwrap();
        for _ in 0..n {
            store
                .create_from_images(gradient_photo(12, 8), gradient_photo(12, 8))
                .unwrap();
        }
        (store, fs)
    }

    // =========================================================================
    // open
    // =========================================================================

    #[test]
    fn open_missing_root_is_invalid_directory() {
        let (services, _fs) = memory_services(ROOT);
        let result = PhotoStore::open(Path::new("/nowhere"), services);
        assert!(matches!(result, Err(Error::InvalidDirectory(_))));
    }

    #[test]
    fn open_reloads_created_records_in_name_order() {
        let (store, fs) = store_with(3);
        let services = store.services().clone();
        let mut expected: Vec<_> = store.iter().map(|r| r.id().clone()).collect();
        expected.sort();

        let reopened = PhotoStore::open(Path::new(ROOT), services).unwrap();
        let ids: Vec<_> = reopened.iter().map(|r| r.id().clone()).collect();
        assert_eq!(ids, expected);
        assert_eq!(fs.list_dirs(Path::new(ROOT)).unwrap().len(), 3);
    }

    #[test]
    fn strict_open_fails_on_malformed_directory() {
        let (store, fs) = store_with(1);
        fs.mkdir_all(Path::new("/library/broken"));
        let result = PhotoStore::open(Path::new(ROOT), store.services().clone());
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn lenient_open_skips_malformed_directory() {
        let (store, fs) = store_with(2);
        fs.mkdir_all(Path::new("/library/broken"));
        fs.put_file(Path::new("/library/broken/LeftPhoto.jpg"), b"x");

        let reopened = PhotoStore::open_with_policy(
            Path::new(ROOT),
            store.services().clone(),
            OpenPolicy::SkipInvalid,
        )
        .unwrap();
        assert_eq!(reopened.count(), 2);
    }

    #[test]
    fn loose_files_in_root_are_ignored() {
        let (store, fs) = store_with(1);
        fs.put_file(Path::new("/library/.DS_Store"), b"junk");
        let reopened = PhotoStore::open(Path::new(ROOT), store.services().clone()).unwrap();
        assert_eq!(reopened.count(), 1);
    }

    // =========================================================================
    // create / add
    // =========================================================================

    #[test]
    fn created_records_are_unique_direct_children() {
        let (store, _fs) = store_with(4);
        assert_eq!(store.count(), 4);
        let mut dirs: Vec<_> = store.iter().map(|r| r.base_dir().to_path_buf()).collect();
        assert!(dirs.iter().all(|d| d.parent() == Some(Path::new(ROOT))));
        dirs.sort();
        dirs.dedup();
        assert_eq!(dirs.len(), 4);
    }

    #[test]
    fn adding_the_same_directory_twice_is_a_no_op() {
        let (mut store, _fs) = store_with(1);
        let dir = store.get(0).unwrap().base_dir().to_path_buf();
        let again = StereogramRecord::load(&dir, store.services()).unwrap();

        assert_eq!(store.add(again).unwrap(), 0);
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn add_rejects_records_outside_root() {
        let (mut store, fs) = store_with(0);
        fs.mkdir_all(Path::new("/other"));
        let outsider = StereogramRecord::create(
            gradient_photo(4, 4),
            gradient_photo(4, 4),
            Path::new("/other"),
            store.services(),
        )
        .unwrap();

        assert!(matches!(store.add(outsider), Err(Error::OutsideRoot { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn import_side_by_side_splits_at_midpoint() {
        let (mut store, _fs) = store_with(0);
        let record = store.import_side_by_side(&gradient_photo(30, 10)).unwrap();
        assert_eq!(record.composite_image().unwrap().dimensions(), (30, 10));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn import_of_single_column_fails_without_side_effects() {
        let (mut store, fs) = store_with(0);
        let result = store.import_side_by_side(&solid_photo(1, 10, [0, 0, 0]));
        assert!(matches!(result, Err(Error::Image(_))));
        assert!(store.is_empty());
        assert!(fs.list_dirs(Path::new(ROOT)).unwrap().is_empty());
    }

    // =========================================================================
    // delete / replace
    // =========================================================================

    #[test]
    fn delete_at_removes_from_disk_and_list() {
        let (mut store, fs) = store_with(2);
        let removed = store.delete_at(0).unwrap();
        assert!(removed.is_deleted());
        assert!(!fs.exists(removed.base_dir()));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn failed_delete_keeps_record_listed() {
        let (mut store, fs) = store_with(1);
        fs.deny_delete(store.get(0).unwrap().base_dir());

        let result = store.delete_at(0);
        assert!(matches!(
            result,
            Err(Error::Persistence(PersistenceError::DeleteFailed { .. }))
        ));
        assert_eq!(store.count(), 1);
        assert!(store.get(0).unwrap().composite_image().is_ok());
    }

    #[test]
    fn delete_by_id() {
        let (mut store, _fs) = store_with(3);
        let id = store.get(1).unwrap().id().clone();
        store.delete(&id).unwrap();
        assert_eq!(store.position(&id), None);
        assert!(matches!(store.delete(&id), Err(Error::UnknownRecord(_))));
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let (mut store, _fs) = store_with(1);
        assert!(matches!(
            store.delete_at(5),
            Err(Error::NoSuchRecord { index: 5, count: 1 })
        ));
        assert!(store.export(1).is_err());
    }

    #[test]
    fn replace_at_swaps_in_new_record() {
        let (mut store, fs) = store_with(2);
        let old_dir = store.get(0).unwrap().base_dir().to_path_buf();
        let fresh = StereogramRecord::create(
            gradient_photo(6, 6),
            gradient_photo(6, 6),
            Path::new(ROOT),
            store.services(),
        )
        .unwrap();
        let fresh_id = fresh.id().clone();

        store.replace_at(0, fresh).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(store.get(0).unwrap().id(), &fresh_id);
        assert!(!fs.exists(&old_dir));
    }

    #[test]
    fn replace_with_itself_is_a_no_op() {
        let (mut store, fs) = store_with(1);
        let dir = store.get(0).unwrap().base_dir().to_path_buf();
        let same = StereogramRecord::load(&dir, store.services()).unwrap();

        store.replace_at(0, same).unwrap();
        assert!(fs.exists(&dir));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn failed_replace_leaves_old_record() {
        let (mut store, fs) = store_with(1);
        let old_id = store.get(0).unwrap().id().clone();
        fs.deny_delete(store.get(0).unwrap().base_dir());
        let fresh = StereogramRecord::create(
            gradient_photo(6, 6),
            gradient_photo(6, 6),
            Path::new(ROOT),
            store.services(),
        )
        .unwrap();

        assert!(store.replace_at(0, fresh).is_err());
        assert_eq!(store.get(0).unwrap().id(), &old_id);
    }

    #[test]
    fn delete_many_stops_at_first_failure_without_rollback() {
        let (mut store, fs) = store_with(6);
        let first = store.get(1).unwrap().id().clone();
        let stuck = store.get(3).unwrap().id().clone();
        fs.deny_delete(store.get(3).unwrap().base_dir());

        assert!(store.delete_many(&[1, 3]).is_err());
        assert_eq!(store.count(), 5);
        assert_eq!(store.position(&first), None);
        assert!(store.position(&stuck).is_some());
    }

    #[test]
    fn delete_many_uses_original_indices() {
        let (mut store, _fs) = store_with(4);
        let keep: Vec<_> = [0, 2].iter().map(|&i| store.get(i).unwrap().id().clone()).collect();

        assert_eq!(store.delete_many(&[1, 3, 1]).unwrap(), 2);
        let left: Vec<_> = store.iter().map(|r| r.id().clone()).collect();
        assert_eq!(left, keep);
    }

    #[test]
    fn delete_many_with_bad_index_changes_nothing() {
        let (mut store, _fs) = store_with(2);
        assert!(store.delete_many(&[0, 9]).is_err());
        assert_eq!(store.count(), 2);
    }

    // =========================================================================
    // export / mode / purge
    // =========================================================================

    #[test]
    fn export_follows_viewing_method() {
        let (mut store, _fs) = store_with(1);
        assert_eq!(store.export(0).unwrap().mime_type, "image/jpeg");
        store
            .set_viewing_method(0, ViewingMethod::AnimatedGif)
            .unwrap();
        assert_eq!(store.export(0).unwrap().mime_type, "image/gif");
    }

    #[test]
    fn purge_caches_clears_every_record() {
        let (store, _fs) = store_with(2);
        for record in &store {
            record.thumbnail_image().unwrap();
        }
        store.purge_caches();
        assert!(store.iter().all(|r| !r.cache_status().thumbnail));
    }

    #[test]
    fn created_directory_holds_exactly_three_files() {
        let (store, fs) = store_with(1);
        let names = fs.file_names(store.get(0).unwrap().base_dir());
        assert_eq!(names, vec![LEFT_PHOTO, PROPERTIES_FILE, RIGHT_PHOTO]);
    }
}
