//! Timestamp persistence.
//!
//! The last-update instant of a context is kept in a `timestamp` file
//! inside the index directory, formatted as `yyyyMMddHHmmss.SSS Z` —
//! the same string that the published properties file carries.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::errors::Result;

pub(crate) const TIMESTAMP_FILE: &str = "timestamp";

/// `yyyyMMddHHmmss.SSS Z`
pub const INDEX_TIME_FORMAT: &str = "%Y%m%d%H%M%S%.3f %z";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(INDEX_TIME_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s.trim(), INDEX_TIME_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Read the timestamp file of an index directory, if present and valid.
pub fn read_timestamp_file(dir: &Path) -> Option<DateTime<Utc>> {
    let raw = std::fs::read_to_string(dir.join(TIMESTAMP_FILE)).ok()?;
    parse_timestamp(&raw)
}

/// Persist (or, for `None`, remove) the timestamp file.
pub fn write_timestamp_file(dir: &Path, ts: Option<DateTime<Utc>>) -> Result<()> {
    let path = dir.join(TIMESTAMP_FILE);
    match ts {
        Some(ts) => std::fs::write(&path, format_timestamp(ts))?,
        None => {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
        }
    }
    Ok(())
}
