//! Error taxonomy for crawling and aggregation.
//!
//! Transport, status and parse failures are fatal for the bucket being
//! crawled and unwind to the top of the run. Protocol inconsistencies are
//! not errors at all; they are reported through
//! [`CrawlObserver`](crate::services::crawler::CrawlObserver).

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("bucket endpoint `{url}` is not a valid URL: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("request to `{endpoint}` (marker={}) failed: {source}", display_marker(.marker))]
    Transport {
        endpoint: String,
        marker: Option<String>,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to `{endpoint}` (marker={}) returned HTTP {status}", display_marker(.marker))]
    HttpStatus {
        endpoint: String,
        marker: Option<String>,
        status: u16,
    },

    #[error("listing from `{endpoint}` (marker={}) is not valid XML: {source}", display_marker(.marker))]
    Parse {
        endpoint: String,
        marker: Option<String>,
        #[source]
        source: roxmltree::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

fn display_marker(marker: &Option<String>) -> &str {
    marker.as_deref().unwrap_or("<none>")
}
