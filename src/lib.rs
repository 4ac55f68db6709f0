//! # Stereocam
//!
//! The persistence and compositing core of a two-shot stereogram camera.
//! The user takes two photographs of the same scene from slightly offset
//! positions; the pair is stored on disk and viewed side by side
//! (cross-eyed or wall-eyed) or as a looping two-frame animation.
//!
//! # Architecture
//!
//! ```text
//!  CaptureSession ──(worker thread)──▶ StereogramRecord::create
//!        │                                      │
//!        └──── poll / wait ─────▶ PhotoStore ◀──┘
//!                                     │
//!                       composite_image / thumbnail_image
//!                                     │
//!                              ThumbnailCache
//! ```
//!
//! Every stereogram is a directory under the library root:
//!
//! ```text
//! Stereograms/
//! └── 1F0C6A3E-5C1B-4A8E-9E51-0B6E3D7C1A22/
//!     ├── LeftPhoto.jpg
//!     ├── RightPhoto.jpg
//!     └── Properties.plist     # ViewingMethod, DateTaken, ScaleFactor, Version
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Split, compose, animate and thumbnail in memory; the `ImageCodec` seam |
//! | [`record`] | One stereogram: its directory, property list and lazily cached images |
//! | [`store`] | The library: load, create, delete, replace, export |
//! | [`capture`] | The take-photo-1 / take-photo-2 / composite state machine |
//! | [`thumbnail_cache`] | LRU thumbnail cache with a memory-pressure purge |
//! | [`properties`] | `Properties.plist` encoding |
//! | [`storage`] | `FileSystem` and `IdGenerator` seams with disk and in-memory implementations |
//! | [`services`] | The collaborator bundle shared by records and the store |
//! | [`config`] | `stereocam.toml` loading and validation |
//! | [`error`] | Error taxonomy |
//! | [`logging`] | `flexi_logger` bootstrap for the binary |
//! | [`output`] | CLI output formatting |
//! | [`types`] | `ViewingMethod`, `RecordId`, `ExportData` |
//!
//! # Design Decisions
//!
//! ## Disk First, Memory Second
//!
//! Every mutation hits the file system before in-memory state changes. A
//! failed delete leaves the record listed; a failed property write leaves the
//! old viewing method and its caches in place. A failed create removes the
//! directory it minted, so a later scan never sees half a stereogram.
//!
//! ## Explicit Cache Slots
//!
//! A record caches four artifacts (both halves, the composite, the thumbnail),
//! each in its own loaded/unloaded slot. Only a viewing-method change, a halves
//! swap, a purge or deletion empties them. Setting the method a record already
//! has is a no-op; that check keeps grid scrolling from re-encoding anything.
//!
//! ## Single-Threaded Mutation
//!
//! The capture worker computes a finished record and sends it back. Only the
//! thread that owns the [`store::PhotoStore`] ever adds it, so records and the
//! store need no locks.

pub mod capture;
pub mod config;
pub mod error;
pub mod imaging;
pub mod logging;
pub mod output;
pub mod properties;
pub mod record;
pub mod services;
pub mod storage;
pub mod store;
pub mod thumbnail_cache;
pub mod types;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod test_helpers;
