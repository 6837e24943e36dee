//! src/services/crawler.rs
//!
//! BucketCrawler: walks the paginated listing of one bucket and yields the
//! filtered object records one at a time. Pagination is an explicit state
//! machine:
//!
//! ```text
//! Fetch ─▶ Drain ─┬─▶ Fetch            (truncated, cursor derived)
//!                 ├─▶ Stopped(Completed)  (IsTruncated = false)
//!                 ├─▶ Stopped(MaxPages)   (page ceiling reached)
//!                 └─▶ Stopped(NoProgress) (truncated, no usable cursor)
//! ```
//!
//! A fetch failure moves the crawler to a terminal failed state and the error
//! is returned to the caller. The crawler is not restartable.

use crate::{
    errors::InventoryResult,
    models::{
        bucket::BucketEndpoint,
        listing::{ListingEntry, Page},
        object::ObjectRecord,
    },
    services::{
        filters::{self, SkipReason},
        listing_fetcher::PageFetcher,
    },
};
use std::{fmt, time::Duration, vec};
use tracing::{debug, error, info, warn};

/// Operational limits for one bucket crawl.
#[derive(Clone, Debug, Default)]
pub struct CrawlOptions {
    /// Pause between consecutive page requests.
    pub page_delay: Duration,

    /// Stop after this many pages, if set.
    pub max_pages: Option<usize>,
}

/// Why a crawl ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The last page reported `IsTruncated = false`.
    Completed,
    /// A truncated page gave no cursor that would advance the listing.
    NoProgress,
    /// The configured page ceiling was reached.
    MaxPages,
}

/// Protocol inconsistencies reported to a [`CrawlObserver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CrawlWarning {
    /// `IsTruncated = true` on a page with no entries.
    EmptyTruncatedPage { marker: Option<String> },
    /// `IsTruncated = true`, no `NextMarker`, and the last entry has no key.
    MissingCursor { marker: Option<String> },
    /// The derived cursor equals the one that requested the page.
    RepeatedCursor { marker: String },
}

impl fmt::Display for CrawlWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlWarning::EmptyTruncatedPage { marker } => write!(
                f,
                "IsTruncated true but no Contents entries found (marker={}); stopping to avoid infinite loop",
                marker.as_deref().unwrap_or("<none>")
            ),
            CrawlWarning::MissingCursor { marker } => write!(
                f,
                "IsTruncated true but no NextMarker and no key on the last entry (marker={}); stopping",
                marker.as_deref().unwrap_or("<none>")
            ),
            CrawlWarning::RepeatedCursor { marker } => write!(
                f,
                "next marker `{marker}` equals the marker that requested the page; stopping to avoid infinite loop"
            ),
        }
    }
}

/// Receives crawl warnings. Injected so the crawler never writes to a
/// shared log directly.
pub trait CrawlObserver {
    fn on_warning(&self, endpoint: &BucketEndpoint, warning: &CrawlWarning);
}

/// Observer that forwards warnings to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn on_warning(&self, endpoint: &BucketEndpoint, warning: &CrawlWarning) {
        warn!(bucket = %endpoint.name(), url = %endpoint, "{}", warning);
    }
}

/// Counters for one bucket crawl.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages: usize,
    pub entries_seen: usize,
    pub emitted: usize,
    pub skipped_versioned: usize,
    pub skipped_doi_metadata: usize,
    /// Set once the crawl reaches a terminal, non-error state.
    pub stop: Option<StopReason>,
}

impl CrawlStats {
    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::VersionedDataset => self.skipped_versioned += 1,
            SkipReason::DoiMetadata => self.skipped_doi_metadata += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_versioned + self.skipped_doi_metadata
    }
}

/// What happens once the current page has been drained.
#[derive(Debug)]
enum Transition {
    Continue(String),
    Stop(StopReason),
    Halt(CrawlWarning),
}

#[derive(Debug)]
enum CrawlState {
    Fetch {
        marker: Option<String>,
    },
    Drain {
        entries: vec::IntoIter<ListingEntry>,
        then: Transition,
    },
    Stopped(StopReason),
    Failed,
}

/// Lazily crawls one bucket.
pub struct BucketCrawler<'a, F, O> {
    fetcher: &'a F,
    observer: &'a O,
    endpoint: BucketEndpoint,
    options: CrawlOptions,
    state: CrawlState,
    stats: CrawlStats,
}

impl<'a, F, O> BucketCrawler<'a, F, O>
where
    F: PageFetcher,
    O: CrawlObserver,
{
    pub fn new(
        fetcher: &'a F,
        observer: &'a O,
        endpoint: BucketEndpoint,
        options: CrawlOptions,
    ) -> Self {
        info!(bucket = %endpoint.name(), url = %endpoint, "starting bucket");
        Self {
            fetcher,
            observer,
            endpoint,
            options,
            state: CrawlState::Fetch { marker: None },
            stats: CrawlStats::default(),
        }
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Pull the next record that passes the filter rules.
    ///
    /// Returns `Ok(None)` once the crawl has stopped. After an error the
    /// crawler is finished and keeps returning `Ok(None)`.
    pub async fn next_record(&mut self) -> InventoryResult<Option<ObjectRecord>> {
        loop {
            match std::mem::replace(&mut self.state, CrawlState::Failed) {
                CrawlState::Fetch { marker } => {
                    self.state = self.fetch(marker).await?;
                }
                CrawlState::Drain { mut entries, then } => {
                    let Some(entry) = entries.next() else {
                        self.state = self.advance(then).await;
                        continue;
                    };
                    self.state = CrawlState::Drain { entries, then };
                    if let Some(record) = self.admit(&entry) {
                        return Ok(Some(record));
                    }
                }
                CrawlState::Stopped(reason) => {
                    self.state = CrawlState::Stopped(reason);
                    return Ok(None);
                }
                CrawlState::Failed => return Ok(None),
            }
        }
    }

    async fn fetch(&mut self, marker: Option<String>) -> InventoryResult<CrawlState> {
        let page = self
            .fetcher
            .fetch_page(&self.endpoint, marker.as_deref())
            .await
            .inspect_err(|err| {
                error!(
                    bucket = %self.endpoint.name(),
                    marker = marker.as_deref().unwrap_or("<none>"),
                    "failed to fetch listing page: {}",
                    err
                );
            })?;

        self.stats.pages += 1;
        info!(
            bucket = %self.endpoint.name(),
            page = self.stats.pages,
            entries = page.entries.len(),
            "got listing page"
        );

        let then = self.transition(&page, marker.as_deref());
        Ok(CrawlState::Drain {
            entries: page.entries.into_iter(),
            then,
        })
    }

    fn transition(&self, page: &Page, requested: Option<&str>) -> Transition {
        if !page.is_truncated {
            return Transition::Stop(StopReason::Completed);
        }

        let Some(next) = page.continuation_marker() else {
            let marker = requested.map(str::to_string);
            return Transition::Halt(if page.entries.is_empty() {
                CrawlWarning::EmptyTruncatedPage { marker }
            } else {
                CrawlWarning::MissingCursor { marker }
            });
        };

        if requested == Some(next.as_str()) {
            return Transition::Halt(CrawlWarning::RepeatedCursor { marker: next });
        }

        if self
            .options
            .max_pages
            .is_some_and(|max| self.stats.pages >= max)
        {
            return Transition::Stop(StopReason::MaxPages);
        }

        Transition::Continue(next)
    }

    async fn advance(&mut self, then: Transition) -> CrawlState {
        match then {
            Transition::Continue(marker) => {
                if !self.options.page_delay.is_zero() {
                    tokio::time::sleep(self.options.page_delay).await;
                }
                CrawlState::Fetch {
                    marker: Some(marker),
                }
            }
            Transition::Stop(reason) => self.finish(reason),
            Transition::Halt(warning) => {
                self.observer.on_warning(&self.endpoint, &warning);
                self.finish(StopReason::NoProgress)
            }
        }
    }

    fn admit(&mut self, entry: &ListingEntry) -> Option<ObjectRecord> {
        self.stats.entries_seen += 1;
        let record = entry.to_record(&self.endpoint);
        match filters::evaluate(&record) {
            Some(reason) => {
                debug!(key = %record.key, %reason, "skipping object");
                self.stats.record_skip(reason);
                None
            }
            None => {
                self.stats.emitted += 1;
                Some(record)
            }
        }
    }

    fn finish(&mut self, reason: StopReason) -> CrawlState {
        let bucket = self.endpoint.name();
        match reason {
            StopReason::Completed => info!(bucket = %bucket, "no more pages"),
            StopReason::MaxPages => info!(
                bucket = %bucket,
                max_pages = self.stats.pages,
                "reached page limit; stopping early"
            ),
            StopReason::NoProgress => {}
        }
        if self.stats.skipped_versioned > 0 {
            info!(
                bucket = %bucket,
                skipped = self.stats.skipped_versioned,
                "skipped objects containing 'envidat.1' in their path"
            );
        }
        if self.stats.skipped_doi_metadata > 0 {
            info!(
                bucket = %bucket,
                skipped = self.stats.skipped_doi_metadata,
                "skipped metadata files (.html/.json/.xml)"
            );
        }
        info!(
            bucket = %bucket,
            pages = self.stats.pages,
            emitted = self.stats.emitted,
            "finished bucket"
        );

        self.stats.stop = Some(reason);
        CrawlState::Stopped(reason)
    }
}
