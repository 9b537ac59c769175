//! Phases of the crawl loop
//!
//! The loop moves `FetchingPage -> Parsing -> Extending` once per list page and
//! then either goes back to `FetchingPage` or ends in `Done`.

use std::fmt;

/// Represents the current phase of the crawl controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// A list page request is in flight
    FetchingPage,

    /// The fetched list page is being turned into records
    Parsing,

    /// Records are being enriched and appended to the accumulator
    Extending,

    /// Pagination is exhausted or the record target was reached
    Done,
}

impl CrawlPhase {
    /// Returns true once the crawl loop has exited
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Checks whether moving from this phase to `next` is legal
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;

        matches!(
            (self, next),
            (FetchingPage, Parsing)
                | (Parsing, Extending)
                | (Extending, FetchingPage)
                | (Extending, Done)
                // A zero-length crawl ends before the first fetch
                | (FetchingPage, Done)
        )
    }

    /// Short lowercase label for log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchingPage => "fetching_page",
            Self::Parsing => "parsing",
            Self::Extending => "extending",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
