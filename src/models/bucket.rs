//! Represents a bucket endpoint: the root URL of one S3-style listing.

use crate::errors::{InventoryError, InventoryResult};
use reqwest::Url;
use std::fmt;

/// A bucket exposed through an S3-style `ListBucketResult` endpoint.
///
/// Endpoints are read-only configuration. The short bucket name is the last
/// non-empty path segment of the URL, so `https://host/envidat-doi/` and
/// `https://host/envidat-doi` both name the bucket `envidat-doi`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketEndpoint {
    /// The URL exactly as configured; written to every record's `bucket_url`.
    url: String,

    /// Parsed form used to issue requests.
    parsed: Url,

    /// Short bucket name derived from the URL path.
    name: String,
}

impl BucketEndpoint {
    /// Parse a configured endpoint URL.
    pub fn parse(url: &str) -> InventoryResult<Self> {
        let trimmed = url.trim();
        let parsed = Url::parse(trimmed).map_err(|err| InventoryError::InvalidEndpoint {
            url: trimmed.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            url: trimmed.to_string(),
            name: bucket_name_from_url(trimmed),
            parsed,
        })
    }

    /// Split a comma-separated endpoint list, ignoring blank entries.
    pub fn parse_list(list: &str) -> InventoryResult<Vec<Self>> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn parsed_url(&self) -> &Url {
        &self.parsed
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BucketEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

fn bucket_name_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
