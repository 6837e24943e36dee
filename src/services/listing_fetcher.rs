//! src/services/listing_fetcher.rs
//!
//! Fetches a single page of an S3-style bucket listing (ListObjects v1) and
//! parses the `ListBucketResult` XML into a [`Page`]. One call, one request;
//! retries and pagination belong to the crawler.

use crate::{
    errors::{InventoryError, InventoryResult},
    models::{
        bucket::BucketEndpoint,
        listing::{ListingEntry, Page},
    },
};
use regex::Regex;
use reqwest::Client;
use roxmltree::{Document, Node};
use std::{future::Future, sync::LazyLock, time::Duration};
use tracing::debug;

/// Timeout applied to each listing request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

static XMLNS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sxmlns="[^"]+""#).expect("static xmlns pattern"));

/// Source of listing pages.
///
/// `marker` is passed through verbatim as the `marker` query parameter.
pub trait PageFetcher {
    fn fetch_page(
        &self,
        endpoint: &BucketEndpoint,
        marker: Option<&str>,
    ) -> impl Future<Output = InventoryResult<Page>> + Send;
}

/// Fetches listing pages over HTTP.
#[derive(Clone, Debug)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new() -> InventoryResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> InventoryResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(InventoryError::HttpClient)?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(
        &self,
        endpoint: &BucketEndpoint,
        marker: Option<&str>,
    ) -> InventoryResult<Page> {
        let transport = |source| InventoryError::Transport {
            endpoint: endpoint.url().to_string(),
            marker: marker.map(str::to_string),
            source,
        };

        let mut request = self.client.get(endpoint.parsed_url().clone());
        if let Some(marker) = marker {
            debug!(marker = %marker, "requesting page with marker");
            request = request.query(&[("marker", marker)]);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(InventoryError::HttpStatus {
                endpoint: endpoint.url().to_string(),
                marker: marker.map(str::to_string),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(transport)?;
        parse_listing(&body).map_err(|source| InventoryError::Parse {
            endpoint: endpoint.url().to_string(),
            marker: marker.map(str::to_string),
            source,
        })
    }
}

/// Remove the first default-namespace declaration so lookups use bare names.
pub fn strip_namespace(xml: &str) -> std::borrow::Cow<'_, str> {
    XMLNS_ATTR.replace(xml, "")
}

/// Parse a `ListBucketResult` document.
///
/// Missing subelements yield empty strings; only malformed XML is an error.
pub fn parse_listing(xml: &str) -> Result<Page, roxmltree::Error> {
    let stripped = strip_namespace(xml);
    let doc = Document::parse(&stripped)?;
    let root = doc.root_element();

    let entries = root
        .children()
        .filter(|n| n.has_tag_name("Contents"))
        .map(|content| {
            let owner = child(content, "Owner");
            ListingEntry {
                key: child_text(Some(content), "Key"),
                last_modified: child_text(Some(content), "LastModified"),
                etag: child_text(Some(content), "ETag"),
                size: child_text(Some(content), "Size"),
                storage_class: child_text(Some(content), "StorageClass"),
                owner_id: child_text(owner, "ID"),
                owner_display_name: child_text(owner, "DisplayName"),
                kind: child_text(Some(content), "Type"),
            }
        })
        .collect();

    let is_truncated = child_text(Some(root), "IsTruncated")
        .trim()
        .eq_ignore_ascii_case("true");
    let next_marker = Some(child_text(Some(root), "NextMarker")).filter(|m| !m.is_empty());

    Ok(Page {
        entries,
        is_truncated,
        next_marker,
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn child_text(node: Option<Node<'_, '_>>, tag: &str) -> String {
    node.and_then(|n| child(n, tag))
        .and_then(|n| n.text())
        .unwrap_or_default()
        .to_string()
}
