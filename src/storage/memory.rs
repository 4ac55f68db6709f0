//! In-memory [`FileSystem`] for tests.
//!
//! Besides holding a directory tree in memory, [`MemFs`] keeps I/O counters
//! (so tests can assert a cache hit did no reads) and lets a test deny
//! deletes, writes or renames to simulate platform failures.
//!
//! Uses `Mutex` (not `RefCell`) so it is `Sync` and can back records that
//! travel through the capture worker thread.

use super::FileSystem;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct State {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    reads: usize,
    writes: usize,
    deny_delete: BTreeSet<PathBuf>,
    deny_write_names: BTreeSet<String>,
    renames_left: Option<usize>,
}

#[derive(Debug, Default)]
pub struct MemFs {
    state: Mutex<State>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// A file system that already contains `root` (and its ancestors).
    pub fn with_dir(root: impl AsRef<Path>) -> Self {
        let fs = Self::new();
        fs.mkdir_all(root.as_ref());
        fs
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Create `path` and all missing ancestors.
    pub fn mkdir_all(&self, path: &Path) {
        let mut state = self.lock();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            state.dirs.insert(ancestor.to_path_buf());
        }
    }

    /// Seed a file without touching the write counter.
    pub fn put_file(&self, path: &Path, data: &[u8]) {
        if let Some(parent) = path.parent() {
            self.mkdir_all(parent);
        }
        self.lock().files.insert(path.to_path_buf(), data.to_vec());
    }

    /// Number of successful `read` calls so far.
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Number of successful `write` calls so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Make `remove_dir_all(path)` fail with `PermissionDenied`.
    pub fn deny_delete(&self, path: &Path) {
        self.lock().deny_delete.insert(path.to_path_buf());
    }

    /// Make every `write` to a file called `file_name` fail.
    pub fn deny_writes_named(&self, file_name: &str) {
        self.lock().deny_write_names.insert(file_name.to_string());
    }

    /// Let the next `allowed` renames succeed and fail every one after.
    pub fn deny_renames_after(&self, allowed: usize) {
        self.lock().renames_left = Some(allowed);
    }

    /// Lift every denial installed so far.
    pub fn allow_all(&self) {
        let mut state = self.lock();
        state.deny_delete.clear();
        state.deny_write_names.clear();
        state.renames_left = None;
    }

    /// Names of the files directly inside `dir`, sorted.
    pub fn file_names(&self, dir: &Path) -> Vec<String> {
        self.lock()
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

impl FileSystem for MemFs {
    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.dirs.contains(path) || state.files.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.dirs.contains(path) || state.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            ));
        }
        match path.parent() {
            Some(parent) if state.dirs.contains(parent) => {
                state.dirs.insert(path.to_path_buf());
                Ok(())
            }
            Some(parent) => Err(not_found(parent)),
            None => Err(not_found(path)),
        }
    }

    fn list_dirs(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.lock();
        if !state.dirs.contains(path) {
            return Err(not_found(path));
        }
        Ok(state
            .dirs
            .iter()
            .filter(|d| d.parent() == Some(path))
            .cloned()
            .collect())
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut state = self.lock();
        let data = state.files.get(path).cloned().ok_or_else(|| not_found(path))?;
        state.reads += 1;
        Ok(data)
    }

    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if state.deny_write_names.contains(&name) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("writes to {name} are denied"),
            ));
        }
        match path.parent() {
            Some(parent) if state.dirs.contains(parent) => {
                state.files.insert(path.to_path_buf(), data.to_vec());
                state.writes += 1;
                Ok(())
            }
            Some(parent) => Err(not_found(parent)),
            None => Err(not_found(path)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        match state.renames_left {
            Some(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    format!("renaming {} is denied", from.display()),
                ));
            }
            Some(n) => state.renames_left = Some(n - 1),
            None => {}
        }
        let data = state.files.remove(from).ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), data);
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        if state.deny_delete.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("deleting {} is denied", path.display()),
            ));
        }
        if !state.dirs.contains(path) {
            return Err(not_found(path));
        }
        state.dirs.retain(|d| !d.starts_with(path));
        state.files.retain(|f, _| !f.starts_with(path));
        Ok(())
    }
}
