//! Crate-wide error taxonomy.
//!
//! Every core operation returns [`Result`]. Image-level failures live in
//! [`ImageError`], disk mutations that fail are wrapped in
//! [`PersistenceError`], and everything converges on [`Error`].

use crate::imaging::ImageError;
use crate::types::RecordId;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not a directory: {0}")]
    InvalidDirectory(PathBuf),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Invalid file format in {path}: {reason}")]
    InvalidFileFormat { path: PathBuf, reason: String },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("No camera available")]
    NoCameraAvailable,
    #[error("Image error: {0}")]
    Image(#[from] ImageError),
    #[error("Stereogram has been deleted: {0}")]
    RecordDeleted(PathBuf),
    #[error("No stereogram with id {0}")]
    UnknownRecord(RecordId),
    #[error("No stereogram at index {index} (library holds {count})")]
    NoSuchRecord { index: usize, count: usize },
    #[error("{path} is not a direct child of the library root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Failures while mutating the on-disk layout.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to delete {path}: {source}")]
    DeleteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not mint a unique directory name after {attempts} attempts")]
    IdCollision { attempts: usize },
}

impl Error {
    /// Classify a failed read of `path`.
    ///
    /// A missing file keeps its path; any other failure carries only the
    /// platform's description.
    pub(crate) fn from_read(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Unknown(format!("{}: {err}", path.display())),
        }
    }

    pub(crate) fn write_failed(path: &Path, source: io::Error) -> Self {
        PersistenceError::WriteFailed {
            path: path.to_path_buf(),
            source,
        }
        .into()
    }

    pub(crate) fn delete_failed(path: &Path, source: io::Error) -> Self {
        PersistenceError::DeleteFailed {
            path: path.to_path_buf(),
            source,
        }
        .into()
    }
}
