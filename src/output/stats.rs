//! Run statistics
//!
//! Counters collected by the crawl controller and printed once a run ends.

use chrono::{DateTime, Utc};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// When the crawl loop started
    pub started_at: DateTime<Utc>,

    /// When the crawl loop exited
    pub finished_at: Option<DateTime<Utc>>,

    /// List pages fetched successfully
    pub pages_fetched: u32,

    /// Records extracted from list pages, before truncation
    pub records_collected: usize,

    /// Records handed to the sink
    pub records_exported: usize,

    /// Detail pages that listed a quantity
    pub quantities_found: usize,

    /// Detail pages that could not be fetched
    pub detail_failures: usize,

    /// Malformed entries dropped under the skip policy
    pub malformed_skipped: usize,
}

impl CrawlStatistics {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            pages_fetched: 0,
            records_collected: 0,
            records_exported: 0,
            quantities_found: 0,
            detail_failures: 0,
            malformed_skipped: 0,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Elapsed wall time in seconds, if the run has finished
    pub fn duration_seconds(&self) -> Option<f64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }
}

/// Prints statistics to stdout in a human-readable format
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");
    println!("Started:            {}", stats.started_at.to_rfc3339());
    if let Some(finished) = stats.finished_at {
        println!("Finished:           {}", finished.to_rfc3339());
    }
    if let Some(secs) = stats.duration_seconds() {
        println!("Duration:           {:.1}s", secs);
    }
    println!("List pages fetched: {}", stats.pages_fetched);
    println!("Records collected:  {}", stats.records_collected);
    println!("Records exported:   {}", stats.records_exported);
    println!("Quantities found:   {}", stats.quantities_found);
    println!("Detail failures:    {}", stats.detail_failures);
    if stats.malformed_skipped > 0 {
        println!("Malformed skipped:  {}", stats.malformed_skipped);
    }
}
