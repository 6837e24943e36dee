//! Represents one inventoried object and the record-table schema.

use serde::{Deserialize, Deserializer, Serialize};

/// Column order of the persisted record table.
pub const RECORD_COLUMNS: [&str; 10] = [
    "bucket_url",
    "bucket_name",
    "key",
    "last_modified",
    "etag",
    "size",
    "storage_class",
    "owner_id",
    "owner_display_name",
    "type",
];

/// Label used for keys without a file suffix.
pub const NO_EXTENSION: &str = "<no_ext>";

/// A single object discovered in a bucket listing.
///
/// Records are built by the crawler from one `Contents` entry and are never
/// mutated afterwards. Field order matches [`RECORD_COLUMNS`], which is also
/// the CSV column order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ObjectRecord {
    /// Endpoint URL the object was listed from.
    pub bucket_url: String,

    /// Short bucket name (last path segment of `bucket_url`).
    pub bucket_name: String,

    /// Object key; may be empty when the listing omitted it.
    pub key: String,

    /// Timestamp string exactly as the listing reported it.
    pub last_modified: String,

    pub etag: String,

    /// Size in bytes. Unparsable or missing values are stored as 0.
    #[serde(deserialize_with = "deserialize_lenient_size")]
    pub size: u64,

    pub storage_class: String,

    pub owner_id: String,

    pub owner_display_name: String,

    /// Listing `Type` element (e.g. "Normal").
    #[serde(rename = "type")]
    pub kind: String,
}

impl ObjectRecord {
    /// The grouping label for this record's key, see [`extension_label`].
    pub fn extension(&self) -> String {
        extension_label(&self.key)
    }
}

/// Return the suffix of the key's basename, starting at the last `.`.
///
/// Leading dots of the basename do not start a suffix, so `.bashrc` has
/// none. The returned suffix keeps its original case.
pub fn file_suffix(key: &str) -> Option<&str> {
    let base = key.rsplit('/').next().unwrap_or(key);
    let dot = base.rfind('.')?;
    if base[..dot].bytes().all(|b| b == b'.') {
        return None;
    }
    Some(&base[dot..])
}

/// Derive the extension label used for aggregation.
///
/// Blank keys and keys whose basename has no suffix map to `<no_ext>`;
/// everything else is the lower-cased suffix including the dot.
pub fn extension_label(key: &str) -> String {
    if key.trim().is_empty() {
        return NO_EXTENSION.to_string();
    }
    match file_suffix(key) {
        Some(suffix) => suffix.to_lowercase(),
        None => NO_EXTENSION.to_string(),
    }
}

/// Parse a size value leniently.
///
/// Accepts plain integers and non-negative finite decimals (truncated).
/// Anything else, including negatives and decimals beyond `u64`, yields 0.
pub fn parse_size(raw: &str) -> u64 {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u64>() {
        return n;
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f < u64::MAX as f64 => f as u64,
        _ => 0,
    }
}

fn deserialize_lenient_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(parse_size).unwrap_or(0))
}
