//! The `Properties.plist` sidecar stored next to each stereogram's halves.
//!
//! ## Format
//!
//! An XML property list holding a flat string-keyed dictionary:
//!
//! | Key | Type | Default when missing |
//! |---|---|---|
//! | `ViewingMethod` | integer ([`ViewingMethod::code`]) | `Crosseyed` |
//! | `DateTaken` | date | none |
//! | `ScaleFactor` | integer | 1 |
//! | `Version` | integer | 1 |
//!
//! Unknown keys are ignored. A known key holding the wrong type, and an
//! unknown viewing-method code, fall back to that key's default alone. Data that is not a property list at all is an
//! [`Error::InvalidFileFormat`]; the record loader decides whether to
//! substitute defaults.

use crate::error::{Error, Result};
use crate::types::ViewingMethod;
use serde::Serialize;
use std::path::Path;
use std::time::SystemTime;

/// Current property-list format version.
pub const PROPERTIES_VERSION: u64 = 1;

/// Decoded record properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Properties {
    pub viewing_method: ViewingMethod,
    pub date_taken: Option<SystemTime>,
    pub scale: u32,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            viewing_method: ViewingMethod::default(),
            date_taken: None,
            scale: 1,
        }
    }
}

/// Written shape. Reading goes key by key through a [`plist::Dictionary`]
/// so one mistyped value only loses that key.
#[derive(Debug, Serialize)]
struct RawProperties {
    #[serde(rename = "ViewingMethod")]
    viewing_method: i64,
    #[serde(rename = "DateTaken", skip_serializing_if = "Option::is_none")]
    date_taken: Option<plist::Date>,
    #[serde(rename = "ScaleFactor")]
    scale: u64,
    #[serde(rename = "Version")]
    version: u64,
}

const KEY_VIEWING_METHOD: &str = "ViewingMethod";
const KEY_DATE_TAKEN: &str = "DateTaken";
const KEY_SCALE: &str = "ScaleFactor";

/// Look up `key` and convert it, logging (and dropping) a mistyped value.
fn field<T>(
    dict: &plist::Dictionary,
    key: &str,
    path: &Path,
    convert: impl FnOnce(&plist::Value) -> Option<T>,
) -> Option<T> {
    let value = dict.get(key)?;
    let converted = convert(value);
    if converted.is_none() {
        log::warn!(
            "event=properties_key_defaulted module=properties key={} path={}",
            key,
            path.display()
        );
    }
    converted
}

impl Properties {
    /// Fresh properties for a stereogram captured now.
    pub fn captured_now(scale: u32) -> Self {
        Self {
            viewing_method: ViewingMethod::default(),
            date_taken: Some(SystemTime::now()),
            scale: scale.max(1),
        }
    }

    /// Parse property-list bytes. `path` is only used for error reporting.
    pub fn parse(bytes: &[u8], path: &Path) -> Result<Self> {
        let dict: plist::Dictionary =
            plist::from_bytes(bytes).map_err(|e| Error::InvalidFileFormat {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let code = field(&dict, KEY_VIEWING_METHOD, path, plist::Value::as_signed_integer);
        let viewing_method = code
            .map(|code| {
                ViewingMethod::from_code(code).unwrap_or_else(|| {
                    log::warn!(
                        "event=properties_unknown_method module=properties code={} path={}",
                        code,
                        path.display()
                    );
                    ViewingMethod::default()
                })
            })
            .unwrap_or_default();
        let date_taken = field(&dict, KEY_DATE_TAKEN, path, plist::Value::as_date);
        let scale = field(&dict, KEY_SCALE, path, |v| {
            v.as_unsigned_integer().and_then(|s| u32::try_from(s).ok())
        });

        Ok(Self {
            viewing_method,
            date_taken: date_taken.map(SystemTime::from),
            scale: scale.unwrap_or(1).max(1),
        })
    }

    /// Serialize as an XML property list.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let raw = RawProperties {
            viewing_method: self.viewing_method.code(),
            date_taken: self.date_taken.map(plist::Date::from),
            scale: u64::from(self.scale),
            version: PROPERTIES_VERSION,
        };
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, &raw)
            .map_err(|e| Error::Unknown(format!("property list encoding failed: {e}")))?;
        Ok(buf)
    }
}
