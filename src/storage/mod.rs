//! # Storage Layer
//!
//! The core never calls `std::fs` directly. Every disk operation goes through
//! the [`FileSystem`] trait so the store logic can be exercised against an
//! in-memory double that counts reads and injects failures.
//!
//! ## Implementations
//!
//! - [`LocalFs`]: Production implementation over `std::fs` and `walkdir`.
//! - [`MemFs`]: In-memory tree for testing without filesystem I/O.
//!
//! Unique directory names come from an [`IdGenerator`]:
//!
//! - [`UuidGenerator`]: random v4 UUIDs.
//! - [`FixedIds`]: a scripted sequence, used to force collisions in tests.

use std::io;
use std::path::{Path, PathBuf};

pub mod ids;
pub mod local;
pub mod memory;

pub use ids::{FixedIds, IdGenerator, UuidGenerator};
pub use local::LocalFs;
pub use memory::MemFs;

/// Minimal file-system surface used by records and the store.
///
/// Implementations must be `Send + Sync`: records are created on the capture
/// worker thread and handed back to the interactive thread.
pub trait FileSystem: Send + Sync {
    /// Whether anything (file or directory) exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create a single directory. The parent must exist and `path` must not.
    fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Immediate subdirectories of `path`, sorted by name.
    fn list_dirs(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Read a whole file.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate a file with `data`.
    fn write(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Rename a file, replacing any existing destination.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Recursively remove a directory and everything under it.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}
