//! Shelf-Crawler: a polite paginated catalog crawler
//!
//! This crate walks the list pages of a product catalog, turns each entry into a
//! typed [`CatalogRecord`], enriches it with data from the entry's detail page,
//! and exports the collected records as CSV.

pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod robots;
pub mod state;

use thiserror::Error;

/// Main error type for Shelf-Crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch {url} after {attempts} attempts")]
    FetchExhausted { url: String, attempts: u32 },

    #[error("Malformed record on {url}: {message}")]
    MalformedRecord { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid crawl phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Result type alias for Shelf-Crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use record::CatalogRecord;
pub use state::{CrawlPhase, CrawlState};
