//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop, which:
//! - Follows pagination from the start URL
//! - Fetches and parses each list page
//! - Enriches the page's records from their detail pages
//! - Stops once enough records are collected or pagination ends
//! - Hands the final record set to a sink

use crate::config::{validate, Config};
use crate::crawler::enrich::enrich_records;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{parse_list_page, CatalogSelectors};
use crate::output::{CrawlStatistics, RecordSink};
use crate::record::CatalogRecord;
use crate::robots::{probe_robots, RobotsProbe};
use crate::state::{CrawlPhase, CrawlState};
use crate::CrawlError;
use std::time::Duration;
use url::Url;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    fetcher: Fetcher,
    selectors: CatalogSelectors,
    stats: CrawlStatistics,
    robots: Option<RobotsProbe>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Validates the configuration, builds the HTTP client, and compiles the
    /// catalog selectors.
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        validate(&config)?;
        let fetcher = Fetcher::from_config(&config)?;
        Self::with_fetcher(config, fetcher)
    }

    /// Creates a coordinator around an existing fetcher
    pub fn with_fetcher(config: Config, fetcher: Fetcher) -> Result<Self, CrawlError> {
        let selectors = CatalogSelectors::compile(&config.selectors)?;
        Ok(Self {
            config,
            fetcher,
            selectors,
            stats: CrawlStatistics::start(),
            robots: None,
        })
    }

    /// Statistics of the most recent crawl
    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }

    /// Result of the startup robots.txt probe, if one was made and answered
    pub fn robots(&self) -> Option<&RobotsProbe> {
        self.robots.as_ref()
    }

    /// Runs the crawl described by the configuration
    ///
    /// Probes robots.txt first when enabled; the probe never blocks the crawl.
    pub async fn run(&mut self) -> Result<Vec<CatalogRecord>, CrawlError> {
        let start_url = Url::parse(&self.config.crawler.start_url)?;

        if self.config.crawler.probe_robots {
            self.robots = probe_robots(
                self.fetcher.client(),
                &start_url,
                &self.config.user_agent.crawler_name,
            )
            .await;

            if let Some(delay) = self.robots.as_ref().and_then(|probe| probe.crawl_delay) {
                let configured = self.config.crawler.page_delay_ms as f64 / 1000.0;
                if delay > configured {
                    tracing::warn!(
                        "robots.txt crawl delay {}s exceeds the configured page delay {}s",
                        delay,
                        configured
                    );
                }
            }
        }

        self.crawl(start_url, self.config.crawler.min_records).await
    }

    /// Collects up to `min_records` records, starting at `start_url`
    ///
    /// # Loop
    ///
    /// 1. Fetch the current list page (retrying per the fetch policy)
    /// 2. Parse it into records and the next page URL
    /// 3. Drop records beyond what is still needed, then enrich the rest
    /// 4. Append, advance to the next page, and wait the page delay
    ///
    /// A list page that exhausts its retries aborts the crawl with
    /// `CrawlError::FetchExhausted`; a failing detail page only leaves that
    /// record's quantity empty.
    pub async fn crawl(
        &mut self,
        start_url: Url,
        min_records: usize,
    ) -> Result<Vec<CatalogRecord>, CrawlError> {
        tracing::info!(
            "Starting crawl at {} (target: {} records)",
            start_url,
            min_records
        );

        self.stats = CrawlStatistics::start();
        let page_delay = Duration::from_millis(self.config.crawler.page_delay_ms);
        let concurrency = self.config.crawler.detail_concurrency;
        let policy = self.config.crawler.on_malformed;

        let mut state = CrawlState::new(start_url, min_records);

        while state.should_continue() {
            let Some(page_url) = state.current_url().cloned() else {
                break;
            };

            let page = self.fetcher.fetch(&page_url).await?;
            tracing::debug!(
                "Fetched {} (status {}, {} bytes)",
                page.url,
                page.status_code,
                page.body.len()
            );
            state.transition(CrawlPhase::Parsing)?;

            let mut list = parse_list_page(&page.body, &page_url, &self.selectors, policy)?;
            self.stats.records_collected += list.records.len();
            self.stats.malformed_skipped += list.skipped;
            state.transition(CrawlPhase::Extending)?;

            // Records past the target are never exported, so skip their detail pages
            list.records.truncate(state.remaining());

            let report = enrich_records(
                &self.fetcher,
                &mut list.records,
                self.selectors.availability(),
                concurrency,
            )
            .await;
            self.stats.quantities_found += report.found;
            self.stats.detail_failures += report.failed;

            state.extend(list.records, list.next_page);
            tracing::info!(
                "Collected {} records so far ({} pages)",
                state.len(),
                state.pages_fetched()
            );
            tracing::trace!("Crawl phase: {}", state.phase());

            if state.should_continue() {
                state.transition(CrawlPhase::FetchingPage)?;
                if !page_delay.is_zero() {
                    tokio::time::sleep(page_delay).await;
                }
            }
        }

        if state.current_url().is_none() && state.len() < min_records {
            tracing::info!(
                "Pagination exhausted after {} records (target was {})",
                state.len(),
                min_records
            );
        }
        if state.is_empty() && min_records > 0 {
            tracing::warn!("No records were collected");
        }

        state.transition(CrawlPhase::Done)?;
        tracing::debug!("Crawl phase: {}", state.phase());
        self.stats.pages_fetched = state.pages_fetched();

        let records = state.finish();
        self.stats.finish();

        Ok(records)
    }
}

/// Runs the main crawl operation and exports the result
///
/// Nothing is written to `sink` unless the crawl succeeds.
///
/// # Example
///
/// ```no_run
/// use shelf_crawler::config::Config;
/// use shelf_crawler::crawler::run_crawl;
/// use shelf_crawler::output::CsvSink;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let mut sink = CsvSink::from_config(&config.output);
/// let stats = run_crawl(config, &mut sink).await?;
/// println!("exported {}", stats.records_exported);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    sink: &mut dyn RecordSink,
) -> Result<CrawlStatistics, CrawlError> {
    let mut coordinator = Coordinator::new(config)?;
    let records = coordinator.run().await?;

    sink.write_records(&records)?;

    let mut stats = coordinator.statistics().clone();
    stats.records_exported = records.len();
    tracing::info!(
        "Saved {} records to {}",
        records.len(),
        sink.destination()
    );

    Ok(stats)
}
