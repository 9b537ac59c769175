//! Crawler module for catalog fetching and extraction
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - List page parsing into catalog records
//! - Detail page parsing and record enrichment
//! - Overall crawl coordination

mod coordinator;
mod detail;
mod enrich;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, Coordinator};
pub use detail::parse_availability;
pub use enrich::{enrich_records, fetch_quantity, DetailOutcome, EnrichReport};
pub use fetcher::{build_http_client, FetchedPage, Fetcher, RetryPolicy};
pub use parser::{parse_list_page, CatalogSelectors, ListPage};

use crate::config::Config;
use crate::output::{CrawlStatistics, CsvSink};
use crate::CrawlError;

/// Runs a complete crawl and writes the configured CSV export
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the configuration and build the HTTP client
/// 2. Probe robots.txt (informational)
/// 3. Follow pagination, parsing and enriching each page
/// 4. Export the records to the configured CSV path
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Crawl completed and the export was written
/// * `Err(CrawlError)` - Crawl failed; no export was written
pub async fn crawl(config: Config) -> Result<CrawlStatistics, CrawlError> {
    let mut sink = CsvSink::from_config(&config.output);
    run_crawl(config, &mut sink).await
}
