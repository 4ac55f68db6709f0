//! Shared value types used across the store, records and capture workflow.
//!
//! [`ViewingMethod`] is persisted as an integer under the `ViewingMethod` key
//! of each record's `Properties.plist`, so the discriminants below are part of
//! the on-disk format and must never be renumbered.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// How the left and right halves are combined for display and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewingMethod {
    /// Left half on the left, right half on the right.
    #[default]
    Crosseyed,
    /// Halves swapped: right half on the left.
    Walleyed,
    /// Anaglyph. Not implemented by the compositor.
    RedGreen,
    /// Random-dot autostereogram. Not implemented by the compositor.
    RandomDot,
    /// Two-frame looping animation alternating left and right.
    AnimatedGif,
}

impl ViewingMethod {
    pub const ALL: [ViewingMethod; 5] = [
        ViewingMethod::Crosseyed,
        ViewingMethod::Walleyed,
        ViewingMethod::RedGreen,
        ViewingMethod::RandomDot,
        ViewingMethod::AnimatedGif,
    ];

    /// Integer code stored in the property list.
    pub fn code(self) -> i64 {
        match self {
            ViewingMethod::Crosseyed => 0,
            ViewingMethod::Walleyed => 1,
            ViewingMethod::RedGreen => 2,
            ViewingMethod::RandomDot => 3,
            ViewingMethod::AnimatedGif => 4,
        }
    }

    /// Inverse of [`code`](Self::code). Unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.code() == code)
    }

    /// MIME type of exported data. Depends on the method only.
    pub fn mime_type(self) -> &'static str {
        match self {
            ViewingMethod::AnimatedGif => "image/gif",
            _ => "image/jpeg",
        }
    }

    /// File extension matching [`mime_type`](Self::mime_type).
    pub fn file_extension(self) -> &'static str {
        match self {
            ViewingMethod::AnimatedGif => "gif",
            _ => "jpg",
        }
    }

    fn name(self) -> &'static str {
        match self {
            ViewingMethod::Crosseyed => "crosseyed",
            ViewingMethod::Walleyed => "walleyed",
            ViewingMethod::RedGreen => "red-green",
            ViewingMethod::RandomDot => "random-dot",
            ViewingMethod::AnimatedGif => "animated-gif",
        }
    }
}

impl fmt::Display for ViewingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ViewingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.name() == wanted || m.name().replace('-', "") == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|m| m.name()).collect();
                format!("unknown viewing method '{s}' (expected one of {names:?})")
            })
    }
}

/// Identity of a stereogram: the name of its base directory under the store root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialized composite ready to hand to a share sheet or write to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportData {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}
