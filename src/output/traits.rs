//! Output handler traits and types
//!
//! A [`RecordSink`] receives the final record set once, after a crawl has
//! succeeded. [`crate::output::CsvSink`] is the file-backed implementation.

use crate::record::CatalogRecord;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for the final record set
pub trait RecordSink {
    /// Writes all records, replacing any previous export
    ///
    /// # Arguments
    ///
    /// * `records` - The exported records, in discovery order
    ///
    /// # Errors
    ///
    /// Returns `OutputError` if the destination cannot be written.
    fn write_records(&mut self, records: &[CatalogRecord]) -> OutputResult<()>;

    /// Human-readable location of the export, for log lines
    fn destination(&self) -> String;
}

/// In-memory sink, handy for embedding and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Records from the last `write_records` call
    pub records: Vec<CatalogRecord>,
}

impl RecordSink for MemorySink {
    fn write_records(&mut self, records: &[CatalogRecord]) -> OutputResult<()> {
        self.records = records.to_vec();
        Ok(())
    }

    fn destination(&self) -> String {
        "memory".to_string()
    }
}
