//! Storage key generation.
//!
//! Keys have the form `YYYY/MM/DD/<uuid>[.ext]`: partitioned by the save date,
//! unique through a random UUID, and keeping the original extension.

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

/// Generates a fresh storage key for `file_name` saved at `timestamp`.
#[must_use]
pub fn create_file_key(file_name: &str, timestamp: DateTime<Utc>) -> String {
    format!(
        "{}/{}",
        date_dir(timestamp),
        uuid_file_name(file_name, Uuid::new_v4())
    )
}

fn date_dir(timestamp: DateTime<Utc>) -> String {
    format!(
        "{}/{:02}/{:02}",
        timestamp.year(),
        timestamp.month(),
        timestamp.day()
    )
}

fn uuid_file_name(file_name: &str, id: Uuid) -> String {
    match extension(file_name) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Extension of the last path segment of `file_name`, without the dot.
#[must_use]
pub fn extension(file_name: &str) -> Option<&str> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// MIME type for `file_name`, `application/octet-stream` when unknown.
#[must_use]
pub fn content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
