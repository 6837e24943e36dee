//! Record filtering rules applied while crawling.
//!
//! Rules run in a fixed order and short-circuit: the first rule that rejects
//! a record decides its [`SkipReason`]. Each rule is a plain function over an
//! [`ObjectRecord`] so it can be tested without a network.

use crate::models::object::{ObjectRecord, file_suffix};
use std::fmt;

/// Bucket whose landing-page metadata files are excluded from the inventory.
pub const DOI_BUCKET: &str = "envidat-doi";

/// Suffixes dropped from [`DOI_BUCKET`] (compared case-insensitively).
pub const DOI_METADATA_SUFFIXES: [&str; 3] = [".html", ".json", ".xml"];

/// Key fragment marking versioned DOI dataset copies, excluded everywhere.
pub const VERSIONED_DATASET_MARKER: &str = "envidat.1";

/// Why a record was discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Key contains `envidat.1` (any bucket).
    VersionedDataset,
    /// `.html`/`.json`/`.xml` in the `envidat-doi` bucket.
    DoiMetadata,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::VersionedDataset => f.write_str("versioned dataset"),
            SkipReason::DoiMetadata => f.write_str("envidat-doi metadata"),
        }
    }
}

/// A rejecting predicate: returns `true` when the record must be dropped.
pub type RejectFn = fn(&ObjectRecord) -> bool;

/// Ordered rule chain used by the crawler.
pub const RULES: [(SkipReason, RejectFn); 2] = [
    (SkipReason::VersionedDataset, is_versioned_dataset),
    (SkipReason::DoiMetadata, is_doi_metadata),
];

/// Run the rule chain; `None` means the record is kept.
pub fn evaluate(record: &ObjectRecord) -> Option<SkipReason> {
    RULES
        .iter()
        .find(|(_, rejects)| rejects(record))
        .map(|(reason, _)| *reason)
}

pub fn is_versioned_dataset(record: &ObjectRecord) -> bool {
    record.key.to_lowercase().contains(VERSIONED_DATASET_MARKER)
}

pub fn is_doi_metadata(record: &ObjectRecord) -> bool {
    if record.bucket_name != DOI_BUCKET {
        return false;
    }
    file_suffix(&record.key)
        .map(|suffix| {
            DOI_METADATA_SUFFIXES
                .iter()
                .any(|s| s.eq_ignore_ascii_case(suffix))
        })
        .unwrap_or(false)
}
