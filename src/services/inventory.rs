//! src/services/inventory.rs
//!
//! Runs the bucket crawler over every configured endpoint, strictly one after
//! another, and appends each emitted record to a single [`RecordSink`]. The
//! first fatal error aborts the run; rows already written stay in the sink.

use crate::{
    errors::InventoryResult,
    format::format_number,
    models::bucket::BucketEndpoint,
    services::{
        crawler::{BucketCrawler, CrawlObserver, CrawlOptions, CrawlStats},
        listing_fetcher::PageFetcher,
        record_table::RecordSink,
    },
};
use tracing::{error, info};

/// Outcome of one bucket crawl.
#[derive(Clone, Debug)]
pub struct BucketSummary {
    pub bucket_name: String,
    pub bucket_url: String,
    pub stats: CrawlStats,
}

/// Outcome of a whole multi-bucket run.
#[derive(Clone, Debug, Default)]
pub struct InventorySummary {
    pub buckets: Vec<BucketSummary>,
}

impl InventorySummary {
    pub fn total_records(&self) -> usize {
        self.buckets.iter().map(|b| b.stats.emitted).sum()
    }

    pub fn total_pages(&self) -> usize {
        self.buckets.iter().map(|b| b.stats.pages).sum()
    }
}

/// Sequential multi-bucket crawl.
pub struct Inventory<'a, F, O> {
    fetcher: &'a F,
    observer: &'a O,
    options: CrawlOptions,
}

impl<'a, F, O> Inventory<'a, F, O>
where
    F: PageFetcher,
    O: CrawlObserver,
{
    pub fn new(fetcher: &'a F, observer: &'a O, options: CrawlOptions) -> Self {
        Self {
            fetcher,
            observer,
            options,
        }
    }

    /// Crawl `endpoints` in order, writing every record to `sink`.
    pub async fn run<S: RecordSink>(
        &self,
        endpoints: &[BucketEndpoint],
        sink: &mut S,
    ) -> InventoryResult<InventorySummary> {
        let mut summary = InventorySummary::default();

        for endpoint in endpoints {
            let stats = match self.crawl_bucket(endpoint, sink).await {
                Ok(stats) => stats,
                Err(err) => {
                    error!(bucket = %endpoint.name(), "aborting run: {}", err);
                    sink.flush()?;
                    return Err(err);
                }
            };
            sink.flush()?;
            summary.buckets.push(BucketSummary {
                bucket_name: endpoint.name().to_string(),
                bucket_url: endpoint.url().to_string(),
                stats,
            });
        }

        info!(
            buckets = summary.buckets.len(),
            pages = summary.total_pages(),
            records = %format_number(summary.total_records() as u64),
            "all buckets processed"
        );
        Ok(summary)
    }

    async fn crawl_bucket<S: RecordSink>(
        &self,
        endpoint: &BucketEndpoint,
        sink: &mut S,
    ) -> InventoryResult<CrawlStats> {
        let mut crawler = BucketCrawler::new(
            self.fetcher,
            self.observer,
            endpoint.clone(),
            self.options.clone(),
        );
        while let Some(record) = crawler.next_record().await? {
            sink.write_record(&record)?;
        }
        Ok(crawler.stats().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::InventoryError,
        models::object::ObjectRecord,
        services::{
            crawler::StopReason,
            record_table::{CsvRecordSink, read_records},
            testing::{RecordingObserver, ScriptedFetcher, page},
        },
    };

    fn endpoints(urls: &[&str]) -> Vec<BucketEndpoint> {
        urls.iter().map(|u| BucketEndpoint::parse(u).unwrap()).collect()
    }

    #[tokio::test]
    async fn merges_buckets_in_configured_order() {
        let fetcher = ScriptedFetcher::new()
            .with_bucket_page("envidat-doi", None, page(&["d/data.zip", "d/meta.json"], false, None))
            .with_bucket_page("edna", None, page(&["e/1.csv", "e/meta.json"], true, Some("m")))
            .with_bucket_page("edna", Some("m"), page(&["e/2.csv"], false, None));
        let observer = RecordingObserver::default();
        let inventory = Inventory::new(&fetcher, &observer, CrawlOptions::default());

        let mut records: Vec<ObjectRecord> = Vec::new();
        let summary = inventory
            .run(
                &endpoints(&["https://host/envidat-doi/", "https://host/edna"]),
                &mut records,
            )
            .await
            .unwrap();

        let keys: Vec<_> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["d/data.zip", "e/1.csv", "e/meta.json", "e/2.csv"]);
        assert_eq!(records[1].bucket_name, "edna");
        assert_eq!(records[1].bucket_url, "https://host/edna");
        assert_eq!(summary.total_records(), 4);
        assert_eq!(summary.buckets[0].stats.skipped_doi_metadata, 1);
        assert_eq!(summary.buckets[1].stats.pages, 2);
        assert_eq!(summary.buckets[1].stats.stop, Some(StopReason::Completed));
    }

    #[tokio::test]
    async fn failure_aborts_remaining_buckets_but_keeps_rows() {
        let fetcher = ScriptedFetcher::new()
            .with_bucket_page("first", None, page(&["a.txt"], false, None))
            .with_bucket_page("second", None, page(&["b.txt"], true, Some("gone")))
            .with_bucket_page("third", None, page(&["c.txt"], false, None));
        let observer = RecordingObserver::default();
        let inventory = Inventory::new(&fetcher, &observer, CrawlOptions::default());

        let mut sink = CsvRecordSink::from_writer(Vec::new()).unwrap();
        let err = inventory
            .run(
                &endpoints(&["https://host/first/", "https://host/second/", "https://host/third/"]),
                &mut sink,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::HttpStatus { status: 404, .. }));
        let requested: Vec<_> = fetcher
            .bucket_requests()
            .into_iter()
            .map(|(bucket, _)| bucket)
            .collect();
        assert_eq!(requested, vec!["first", "second", "second"]);

        let bytes = sink.into_inner().unwrap();
        let keys: Vec<_> = read_records(bytes.as_slice())
            .unwrap()
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(keys, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn no_endpoints_writes_nothing() {
        let fetcher = ScriptedFetcher::new();
        let observer = RecordingObserver::default();
        let inventory = Inventory::new(&fetcher, &observer, CrawlOptions::default());

        let mut records: Vec<ObjectRecord> = Vec::new();
        let summary = inventory.run(&[], &mut records).await.unwrap();

        assert!(records.is_empty());
        assert_eq!(summary.total_records(), 0);
        assert!(fetcher.requests().is_empty());
    }
}
