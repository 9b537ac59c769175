//! Output module for exporting crawl results
//!
//! This module handles:
//! - The `RecordSink` abstraction for persisting the final record set
//! - CSV export with a fixed column order
//! - Run statistics

mod csv_output;
pub mod stats;
mod traits;

pub use csv_output::{write_csv, CsvSink, CSV_HEADER};
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{MemorySink, OutputError, OutputResult, RecordSink};
