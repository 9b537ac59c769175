//! Accumulator owned by the crawl controller
//!
//! [`CrawlState`] holds the records gathered so far (in discovery order), the
//! URL of the next list page to fetch, the list pages already visited, and the
//! current [`CrawlPhase`].

use crate::record::CatalogRecord;
use crate::state::CrawlPhase;
use crate::CrawlError;
use std::collections::HashSet;
use url::Url;

/// Transient state of a single crawl run
#[derive(Debug)]
pub struct CrawlState {
    records: Vec<CatalogRecord>,
    current_url: Option<Url>,
    visited: HashSet<Url>,
    min_records: usize,
    phase: CrawlPhase,
    pages_fetched: u32,
}

impl CrawlState {
    /// Creates the state for a crawl starting at `start_url`
    ///
    /// # Arguments
    ///
    /// * `start_url` - First list page to fetch
    /// * `min_records` - Record target; the crawl stops once it is reached
    pub fn new(start_url: Url, min_records: usize) -> Self {
        Self {
            records: Vec::with_capacity(min_records.min(4096)),
            current_url: Some(start_url),
            visited: HashSet::new(),
            min_records,
            phase: CrawlPhase::FetchingPage,
            pages_fetched: 0,
        }
    }

    /// Returns true while there is a page to fetch and the target is unmet
    ///
    /// Always false once the state has reached [`CrawlPhase::Done`].
    pub fn should_continue(&self) -> bool {
        !self.phase.is_terminal()
            && self.current_url.is_some()
            && self.records.len() < self.min_records
    }

    /// Number of records still needed to reach the target
    pub fn remaining(&self) -> usize {
        self.min_records.saturating_sub(self.records.len())
    }

    /// URL of the next list page, or `None` once pagination is exhausted
    pub fn current_url(&self) -> Option<&Url> {
        self.current_url.as_ref()
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Number of records collected so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Moves to the next phase, rejecting illegal transitions
    pub fn transition(&mut self, next: CrawlPhase) -> Result<(), CrawlError> {
        if !self.phase.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        if next == CrawlPhase::Parsing {
            self.pages_fetched += 1;
        }
        self.phase = next;
        Ok(())
    }

    /// Appends a page's records and advances to the next page URL
    ///
    /// The page just processed is marked as visited. A `next_page` that was
    /// already visited ends pagination, so a catalog whose "next" links form a
    /// cycle cannot feed the same records in twice.
    ///
    /// # Arguments
    ///
    /// * `records` - Records of the current page, in document order
    /// * `next_page` - The page's "next" link, if any
    pub fn extend(&mut self, records: Vec<CatalogRecord>, next_page: Option<Url>) {
        self.records.extend(records);
        if let Some(current) = self.current_url.take() {
            self.visited.insert(current);
        }

        self.current_url = match next_page {
            Some(next) if self.visited.contains(&next) => {
                tracing::warn!("Pagination loops back to {}; stopping", next);
                None
            }
            next => next,
        };
    }

    /// Consumes the state, returning at most `min_records` records
    ///
    /// Overshoot is removed from the tail, so discovery order is preserved.
    pub fn finish(mut self) -> Vec<CatalogRecord> {
        self.records.truncate(self.min_records);
        self.records
    }
}
