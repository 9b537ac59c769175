//! Detail page enrichment
//!
//! Fills in `available_quantity` for records by visiting their detail pages.
//! Failures here are soft: a record whose detail page cannot be fetched keeps
//! `None` and the crawl moves on.

use crate::crawler::detail::parse_availability;
use crate::crawler::fetcher::Fetcher;
use crate::record::CatalogRecord;
use scraper::Selector;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Result of visiting one detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailOutcome {
    /// The page listed a quantity
    Found(u32),
    /// The page was fetched but showed no quantity
    Missing,
    /// The page could not be fetched
    Failed(String),
}

impl DetailOutcome {
    /// Quantity to store on the record
    ///
    /// # Returns
    ///
    /// `Some` only for [`DetailOutcome::Found`]; missing and failed pages both
    /// leave the record without a quantity.
    pub fn quantity(&self) -> Option<u32> {
        match self {
            Self::Found(quantity) => Some(*quantity),
            _ => None,
        }
    }
}

/// Counts from one enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    /// Detail pages that listed a quantity
    pub found: usize,
    /// Detail pages fetched without a readable quantity
    pub missing: usize,
    /// Detail pages that exhausted their retries
    pub failed: usize,
}

/// Fetches a detail page and reads its quantity
///
/// # Arguments
///
/// * `fetcher` - Fetcher whose retry policy applies to the detail request
/// * `url` - Absolute detail page URL
/// * `availability` - Selector of the availability element
///
/// # Returns
///
/// Never an error: exhausted retries become [`DetailOutcome::Failed`].
pub async fn fetch_quantity(fetcher: &Fetcher, url: &Url, availability: &Selector) -> DetailOutcome {
    match fetcher.fetch(url).await {
        Ok(page) => match parse_availability(&page.body, availability) {
            Some(quantity) => DetailOutcome::Found(quantity),
            None => DetailOutcome::Missing,
        },
        Err(e) => DetailOutcome::Failed(e.to_string()),
    }
}

/// Enriches `records` in place from their detail pages
///
/// With `concurrency == 1` detail pages are fetched one after another in
/// record order. Larger values allow that many requests in flight; results are
/// written back by index, so record order never changes.
///
/// # Arguments
///
/// * `fetcher` - Fetcher used for every detail request
/// * `records` - Records to update; each gets `available_quantity` set
/// * `availability` - Selector of the availability element
/// * `concurrency` - Maximum detail requests in flight
///
/// # Returns
///
/// Counts of found, missing, and failed detail pages.
pub async fn enrich_records(
    fetcher: &Fetcher,
    records: &mut [CatalogRecord],
    availability: &Selector,
    concurrency: usize,
) -> EnrichReport {
    let mut report = EnrichReport::default();

    if concurrency <= 1 {
        for record in records.iter_mut() {
            let outcome = fetch_quantity(fetcher, &record.detail_url, availability).await;
            apply(record, outcome, &mut report);
        }
        return report;
    }

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    for (index, record) in records.iter().enumerate() {
        let fetcher = fetcher.clone();
        let url = record.detail_url.clone();
        let availability = availability.clone();
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            (index, fetch_quantity(&fetcher, &url, &availability).await)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => apply(&mut records[index], outcome, &mut report),
            Err(e) => {
                tracing::warn!("Detail task ended abnormally: {}", e);
                report.failed += 1;
            }
        }
    }

    report
}

fn apply(record: &mut CatalogRecord, outcome: DetailOutcome, report: &mut EnrichReport) {
    match &outcome {
        DetailOutcome::Found(quantity) => {
            tracing::debug!("{} units of '{}' available", quantity, record.title);
            report.found += 1;
        }
        DetailOutcome::Missing => {
            tracing::debug!("No quantity on {}", record.detail_url);
            report.missing += 1;
        }
        DetailOutcome::Failed(reason) => {
            tracing::warn!("Could not get quantity for {}: {}", record.detail_url, reason);
            report.failed += 1;
        }
    }
    record.available_quantity = outcome.quantity();
}
