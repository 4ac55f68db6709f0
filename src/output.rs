//! CLI output formatting.
//!
//! # Entity Display Contract
//!
//! Every stereogram is shown the same way by every command:
//!
//! 1. **Header line**: 3-digit positional index + record id
//! 2. **Context lines**: indented `Method:`, `Taken:`, `Source:`
//!
//! ```text
//! Library Stereograms (2 stereograms)
//! 001 1F0C6A3E-5C1B-4A8E-9E51-0B6E3D7C1A22
//!     Method: crosseyed
//!     Taken: 2026-10-18T09:14:03Z
//!     Source: 1F0C6A3E-5C1B-4A8E-9E51-0B6E3D7C1A22/
//! 002 7D2E...
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>` or a
//! `String`) for testability and a `print_*` wrapper that writes to stdout.
//! Format functions are pure: no I/O, no side effects.

use crate::record::StereogramRecord;
use crate::store::PhotoStore;
use crate::thumbnail_cache::CacheStats;
use crate::types::ExportData;
use serde::Serialize;
use std::path::Path;
use std::time::SystemTime;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn format_date(date: Option<SystemTime>) -> Option<String> {
    date.map(|d| plist::Date::from(d).to_xml_format())
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Header plus context lines for one record at 0-based `index`.
fn record_lines(index: usize, record: &StereogramRecord) -> Vec<String> {
    let mut lines = vec![format!("{} {}", format_index(index + 1), record.id())];
    lines.push(format!("{}Method: {}", indent(1), record.viewing_method()));
    if let Some(taken) = format_date(record.date_taken()) {
        lines.push(format!("{}Taken: {}", indent(1), taken));
    }
    if record.scale() != 1 {
        lines.push(format!("{}Scale: {}x", indent(1), record.scale()));
    }
    lines.push(format!("{}Source: {}/", indent(1), record.id()));
    lines
}

// ============================================================================
// list
// ============================================================================

/// Format the whole library.
pub fn format_library(store: &PhotoStore) -> Vec<String> {
    let mut lines = vec![format!(
        "Library {} ({})",
        store.root().display(),
        plural(store.count(), "stereogram")
    )];
    for (index, record) in store.iter().enumerate() {
        lines.extend(record_lines(index, record));
    }
    lines
}

pub fn print_library(store: &PhotoStore) {
    for line in format_library(store) {
        println!("{}", line);
    }
}

/// Machine-readable view of one record.
#[derive(Debug, Serialize)]
pub struct LibraryEntry {
    pub index: usize,
    pub id: String,
    pub path: String,
    pub viewing_method: String,
    pub date_taken: Option<String>,
    pub scale: u32,
}

pub fn library_entries(store: &PhotoStore) -> Vec<LibraryEntry> {
    store
        .iter()
        .enumerate()
        .map(|(index, record)| LibraryEntry {
            index,
            id: record.id().to_string(),
            path: record.base_dir().display().to_string(),
            viewing_method: record.viewing_method().to_string(),
            date_taken: format_date(record.date_taken()),
            scale: record.scale(),
        })
        .collect()
}

pub fn format_library_json(store: &PhotoStore) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&library_entries(store))
}

// ============================================================================
// Mutations
// ============================================================================

pub fn format_created(index: usize, record: &StereogramRecord) -> Vec<String> {
    let mut lines = vec!["Created".to_string()];
    lines.extend(record_lines(index, record));
    lines
}

pub fn print_created(index: usize, record: &StereogramRecord) {
    for line in format_created(index, record) {
        println!("{}", line);
    }
}

pub fn format_deleted(ids: &[String]) -> Vec<String> {
    let mut lines = vec![format!("Deleted {}", plural(ids.len(), "stereogram"))];
    lines.extend(ids.iter().map(|id| format!("{}{}", indent(1), id)));
    lines
}

/// One line per capture prompt.
pub fn format_capture_progress(photo_number: u8) -> String {
    format!("==> Taking photo {} of 2", photo_number)
}

pub fn format_export(data: &ExportData, out: &Path) -> String {
    format!(
        "Exported {} ({} bytes, {}) → {}",
        data.mime_type.trim_start_matches("image/").to_uppercase(),
        data.bytes.len(),
        data.mime_type,
        out.display()
    )
}

pub fn format_thumbnails(written: &[(usize, String)], stats: &CacheStats) -> Vec<String> {
    let mut lines: Vec<String> = written
        .iter()
        .map(|(index, file)| format!("{} → {}", format_index(index + 1), file))
        .collect();
    lines.push(format!("Thumbnails: {}", stats));
    lines
}
