//! Shelf-Crawler main entry point
//!
//! This is the command-line interface for the Shelf-Crawler catalog crawler.

use anyhow::Context;
use clap::Parser;
use shelf_crawler::config::{load_config_with_hash, validate, Config};
use shelf_crawler::crawler::crawl;
use shelf_crawler::output::print_statistics;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shelf-Crawler: a polite paginated catalog crawler
///
/// Follows a catalog's list pages, visits each product's detail page for its
/// available quantity, and writes the records to CSV.
#[derive(Parser, Debug)]
#[command(name = "shelf-crawler")]
#[command(version)]
#[command(about = "A polite paginated catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Override the first list page to fetch
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,

    /// Override the number of records to collect
    #[arg(long, value_name = "N")]
    min_records: Option<usize>,

    /// Override the CSV output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = resolve_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    match crawl(config).await {
        Ok(stats) => {
            if !cli.quiet {
                print_statistics(&stats);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed, no export written: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_crawler=info,warn"),
            1 => EnvFilter::new("shelf_crawler=debug,info"),
            2 => EnvFilter::new("shelf_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("loading {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    if let Some(url) = &cli.start_url {
        config.crawler.start_url = url.clone();
    }
    if let Some(n) = cli.min_records {
        config.crawler.min_records = n;
    }
    if let Some(path) = &cli.output {
        config.output.csv_path = path.clone();
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: prints the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Shelf-Crawler Dry Run ===\n");

    println!("Crawl:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Minimum records: {}", config.crawler.min_records);
    println!("  Page delay: {}ms", config.crawler.page_delay_ms);
    println!("  Detail concurrency: {}", config.crawler.detail_concurrency);
    println!("  Malformed entries: {:?}", config.crawler.on_malformed);
    println!("  Probe robots.txt: {}", config.crawler.probe_robots);

    println!("\nFetch:");
    println!("  Max attempts: {}", config.fetch.max_attempts);
    println!("  Retry delay: {}ms", config.fetch.retry_delay_ms);
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);
    println!("  UTF-8 BOM: {}", config.output.write_bom);

    println!("\n✓ Configuration is valid");
}
