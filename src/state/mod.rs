//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: The phase of the crawl loop (fetching, parsing, extending, done)
//! - `CrawlState`: The ordered record accumulator and pagination cursor

mod crawl_state;
mod phase;

// Re-export main types
pub use crawl_state::CrawlState;
pub use phase::CrawlPhase;
