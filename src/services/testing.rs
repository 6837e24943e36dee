//! Test doubles shared by the service tests.

use crate::{
    errors::{InventoryError, InventoryResult},
    models::{
        bucket::BucketEndpoint,
        listing::{ListingEntry, Page},
    },
    services::{
        crawler::{CrawlObserver, CrawlWarning},
        listing_fetcher::PageFetcher,
    },
};
use std::{collections::HashMap, sync::Mutex};

pub fn entries(keys: &[&str]) -> Vec<ListingEntry> {
    keys.iter()
        .map(|k| ListingEntry {
            size: "10".into(),
            ..ListingEntry::with_key(*k)
        })
        .collect()
}

pub fn page(keys: &[&str], is_truncated: bool, next_marker: Option<&str>) -> Page {
    Page {
        entries: entries(keys),
        is_truncated,
        next_marker: next_marker.map(str::to_string),
    }
}

/// Serves pre-built pages keyed by (bucket name, marker) and records every
/// request. Unknown requests fail with HTTP 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    pages: HashMap<(Option<String>, Option<String>), Page>,
    requests: Mutex<Vec<(String, Option<String>)>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page served to any bucket for `marker`.
    pub fn with_page(mut self, marker: Option<&str>, page: Page) -> Self {
        self.pages.insert((None, marker.map(str::to_string)), page);
        self
    }

    /// Page served only to `bucket` for `marker`.
    pub fn with_bucket_page(mut self, bucket: &str, marker: Option<&str>, page: Page) -> Self {
        self.pages.insert(
            (Some(bucket.to_string()), marker.map(str::to_string)),
            page,
        );
        self
    }

    /// Markers requested so far, in order.
    pub fn requests(&self) -> Vec<Option<String>> {
        self.bucket_requests().into_iter().map(|(_, m)| m).collect()
    }

    /// (bucket name, marker) requested so far, in order.
    pub fn bucket_requests(&self) -> Vec<(String, Option<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        endpoint: &BucketEndpoint,
        marker: Option<&str>,
    ) -> InventoryResult<Page> {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.name().to_string(), marker.map(str::to_string)));

        let marker = marker.map(str::to_string);
        self.pages
            .get(&(Some(endpoint.name().to_string()), marker.clone()))
            .or_else(|| self.pages.get(&(None, marker.clone())))
            .cloned()
            .ok_or_else(|| InventoryError::HttpStatus {
                endpoint: endpoint.url().to_string(),
                marker,
                status: 404,
            })
    }
}

/// Collects warnings instead of logging them.
#[derive(Default)]
pub struct RecordingObserver {
    warnings: Mutex<Vec<CrawlWarning>>,
}

impl RecordingObserver {
    pub fn warnings(&self) -> Vec<CrawlWarning> {
        self.warnings.lock().unwrap().clone()
    }
}

impl CrawlObserver for RecordingObserver {
    fn on_warning(&self, _endpoint: &BucketEndpoint, warning: &CrawlWarning) {
        self.warnings.lock().unwrap().push(warning.clone());
    }
}
