//! Configuration module for Shelf-Crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A configuration file is optional: [`Config::default`] describes the reference
//! catalog and can be overridden key by key.
//!
//! # Example
//!
//! ```no_run
//! use shelf_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Collecting at least {} records", config.crawler.min_records);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, FetchConfig, MalformedPolicy, OutputConfig, SelectorConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
pub(crate) use validation::compile_selector;
