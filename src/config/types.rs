use serde::Deserialize;

/// Main configuration structure for Shelf-Crawler
///
/// Every section is optional in the TOML file; missing sections and keys fall
/// back to the defaults for the reference catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub selectors: SelectorConfig,
}

/// What to do with a list entry that is missing a required field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Abort the whole crawl; nothing is exported
    #[default]
    Abort,
    /// Log a warning and drop the entry
    Skip,
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// First list page to fetch
    pub start_url: String,

    /// Number of records to collect before stopping
    pub min_records: usize,

    /// Delay between successive list page fetches (milliseconds)
    pub page_delay_ms: u64,

    /// Maximum number of detail pages fetched at once
    pub detail_concurrency: usize,

    /// Handling of entries with unparsable required fields
    pub on_malformed: MalformedPolicy,

    /// Whether to probe robots.txt before crawling
    pub probe_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: "https://books.toscrape.com/".to_string(),
            min_records: 1000,
            page_delay_ms: 1000,
            detail_concurrency: 1,
            on_malformed: MalformedPolicy::Abort,
            probe_robots: true,
        }
    }
}

/// HTTP fetch and retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Attempts per URL before giving up
    pub max_attempts: u32,

    /// Delay between attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// Timeout for a single request (seconds)
    pub request_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 2000,
            request_timeout_secs: 10,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the `User-Agent` header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "ShelfCrawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/shelf-crawler".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the CSV export
    pub csv_path: String,

    /// Prefix the export with a UTF-8 byte order mark
    pub write_bom: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: "output/books.csv".to_string(),
            write_bom: true,
        }
    }
}

/// CSS selectors describing the catalog markup
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    /// One match per catalog entry on a list page
    pub entry: String,

    /// Heading link inside an entry (title attribute + href)
    pub title_link: String,

    /// Price text inside an entry
    pub price: String,

    /// Rating element inside an entry; the second class token is the rating
    pub rating: String,

    /// Availability text inside an entry
    pub stock: String,

    /// Image inside an entry
    pub image: String,

    /// Pagination link to the next list page
    pub next_page: String,

    /// Availability text on a detail page
    pub availability: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            entry: "article.product_pod".to_string(),
            title_link: "h3 a".to_string(),
            price: "p.price_color".to_string(),
            rating: "p.star-rating".to_string(),
            stock: "p.instock.availability".to_string(),
            image: "img".to_string(),
            next_page: "li.next a".to_string(),
            availability: "p.instock.availability".to_string(),
        }
    }
}
