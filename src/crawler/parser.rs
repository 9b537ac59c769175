//! List page parser
//!
//! Turns one catalog list page into [`CatalogRecord`]s and the URL of the
//! following page. Parsing is pure: no requests are made here, and every
//! returned record has `available_quantity = None` until the crawler enriches
//! it from the detail page.

use crate::config::{compile_selector, MalformedPolicy, SelectorConfig};
use crate::record::{parse_price, CatalogRecord};
use crate::{ConfigError, CrawlError};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Compiled CSS selectors for the catalog markup
#[derive(Debug, Clone)]
pub struct CatalogSelectors {
    entry: Selector,
    title_link: Selector,
    price: Selector,
    rating: Selector,
    stock: Selector,
    image: Selector,
    next_page: Selector,
    availability: Selector,
}

impl CatalogSelectors {
    /// Compiles every selector in the configuration
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            entry: compile_selector(&config.entry)?,
            title_link: compile_selector(&config.title_link)?,
            price: compile_selector(&config.price)?,
            rating: compile_selector(&config.rating)?,
            stock: compile_selector(&config.stock)?,
            image: compile_selector(&config.image)?,
            next_page: compile_selector(&config.next_page)?,
            availability: compile_selector(&config.availability)?,
        })
    }

    /// Selector for the availability element on a detail page
    pub fn availability(&self) -> &Selector {
        &self.availability
    }
}

/// Result of parsing one list page
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Records in document order
    pub records: Vec<CatalogRecord>,

    /// Absolute URL of the next list page; `None` on the last page
    pub next_page: Option<Url>,

    /// Entries dropped under [`MalformedPolicy::Skip`]
    pub skipped: usize,
}

/// Parses a list page into records and the next page URL
///
/// Relative `href`/`src` values are resolved against `page_url`, the URL this
/// page was fetched from.
///
/// # Errors
///
/// With [`MalformedPolicy::Abort`], the first entry lacking a title link or a
/// parsable price yields `CrawlError::MalformedRecord`. With
/// [`MalformedPolicy::Skip`] such entries are logged and counted instead.
///
/// # Example
///
/// ```
/// use shelf_crawler::config::{MalformedPolicy, SelectorConfig};
/// use shelf_crawler::crawler::{parse_list_page, CatalogSelectors};
/// use url::Url;
///
/// let html = r#"<article class="product_pod">
///   <h3><a href="book_1/index.html" title="A Book">A Bo...</a></h3>
///   <p class="price_color">£10.00</p>
/// </article>"#;
/// let selectors = CatalogSelectors::compile(&SelectorConfig::default()).unwrap();
/// let page_url = Url::parse("https://example.com/catalogue/page-2.html").unwrap();
/// let page = parse_list_page(html, &page_url, &selectors, MalformedPolicy::Abort).unwrap();
/// assert_eq!(page.records[0].detail_url.as_str(), "https://example.com/catalogue/book_1/index.html");
/// ```
pub fn parse_list_page(
    html: &str,
    page_url: &Url,
    selectors: &CatalogSelectors,
    policy: MalformedPolicy,
) -> Result<ListPage, CrawlError> {
    let document = Html::parse_document(html);
    let mut page = ListPage::default();

    for (index, entry) in document.select(&selectors.entry).enumerate() {
        match parse_entry(entry, page_url, selectors) {
            Ok(record) => page.records.push(record),
            Err(message) => match policy {
                MalformedPolicy::Abort => {
                    return Err(CrawlError::MalformedRecord {
                        url: page_url.to_string(),
                        message: format!("entry {}: {}", index + 1, message),
                    });
                }
                MalformedPolicy::Skip => {
                    tracing::warn!(
                        "Skipping malformed entry {} on {}: {}",
                        index + 1,
                        page_url,
                        message
                    );
                    page.skipped += 1;
                }
            },
        }
    }

    page.next_page = document
        .select(&selectors.next_page)
        .next()
        .and_then(|link| link.value().attr("href"))
        .and_then(|href| resolve(page_url, href));

    Ok(page)
}

/// Extracts one record from a catalog entry
///
/// Returns a description of the problem when a required field is missing.
fn parse_entry(
    entry: ElementRef<'_>,
    page_url: &Url,
    selectors: &CatalogSelectors,
) -> Result<CatalogRecord, String> {
    let link = entry
        .select(&selectors.title_link)
        .next()
        .ok_or("missing title link")?;

    let title = link.value().attr("title").unwrap_or("").trim().to_string();

    let href = link.value().attr("href").ok_or("title link has no href")?;
    let detail_url = page_url
        .join(href.trim())
        .map_err(|e| format!("invalid detail link '{}': {}", href, e))?;

    let raw_price = entry
        .select(&selectors.price)
        .next()
        .map(element_text)
        .unwrap_or_default();
    let price = parse_price(&raw_price).ok_or_else(|| format!("unparsable price '{}'", raw_price))?;

    let rating = entry
        .select(&selectors.rating)
        .next()
        .map(rating_word)
        .unwrap_or_default();

    let stock_text = entry
        .select(&selectors.stock)
        .next()
        .map(element_text)
        .unwrap_or_default();

    let image_url = entry
        .select(&selectors.image)
        .next()
        .and_then(|img| img.value().attr("src"))
        .and_then(|src| resolve(page_url, src))
        .map(String::from)
        .unwrap_or_default();

    Ok(CatalogRecord {
        title,
        price,
        rating,
        stock_text,
        available_quantity: None,
        detail_url,
        image_url,
    })
}

/// Reads the rating from a class list such as `star-rating Three`
///
/// The first token marks the element, the second carries the level.
fn rating_word(element: ElementRef<'_>) -> String {
    element
        .value()
        .attr("class")
        .and_then(|classes| classes.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string()
}

/// Concatenates the element's text nodes, each trimmed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}
