//! CSV export of catalog records

use crate::config::OutputConfig;
use crate::output::traits::{OutputResult, RecordSink};
use crate::record::CatalogRecord;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column order of the export
pub const CSV_HEADER: [&str; 7] = [
    "title",
    "price",
    "rating",
    "stock",
    "available_quantity",
    "product_page_url",
    "image_url",
];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes records to a CSV file, creating its directory if needed
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    write_bom: bool,
}

impl CsvSink {
    /// Creates a sink writing to `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Target file; missing parent directories are created on write
    /// * `write_bom` - Prefix the file with a UTF-8 byte order mark
    pub fn new(path: impl Into<PathBuf>, write_bom: bool) -> Self {
        Self {
            path: path.into(),
            write_bom,
        }
    }

    /// Creates a sink from the `[output]` section
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.csv_path, config.write_bom)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn write_records(&mut self, records: &[CatalogRecord]) -> OutputResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&self.path)?;
        if self.write_bom {
            file.write_all(UTF8_BOM)?;
        }

        write_csv(file, records)
    }

    fn destination(&self) -> String {
        self.path.display().to_string()
    }
}

/// Serializes records as CSV (header plus one row each) into `writer`
pub fn write_csv<W: Write>(writer: W, records: &[CatalogRecord]) -> OutputResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;

    for record in records {
        let price = record.price.to_string();
        let quantity = record
            .available_quantity
            .map(|q| q.to_string())
            .unwrap_or_default();

        csv_writer.write_record([
            record.title.as_str(),
            price.as_str(),
            record.rating.as_str(),
            record.stock_text.as_str(),
            quantity.as_str(),
            record.detail_url.as_str(),
            record.image_url.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
