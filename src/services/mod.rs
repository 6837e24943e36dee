//! Crawling, persistence and aggregation services.

pub mod aggregator;
pub mod crawler;
pub mod filters;
pub mod inventory;
pub mod listing_fetcher;
pub mod record_table;

#[cfg(test)]
pub mod testing;
