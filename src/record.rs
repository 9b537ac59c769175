//! Catalog record type
//!
//! One [`CatalogRecord`] is produced per entry on a list page. Every field but
//! `available_quantity` comes from the list page itself; the quantity is filled
//! in later from the entry's detail page.

use url::Url;

/// A single product scraped from the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    /// Product title, taken from the heading link's `title` attribute
    pub title: String,

    /// Non-negative price with the currency symbol stripped
    pub price: f64,

    /// Rating word such as `"Three"`, or empty when the entry has no rating
    pub rating: String,

    /// Availability text as shown on the list page
    pub stock_text: String,

    /// Units in stock according to the detail page, if it could be read
    pub available_quantity: Option<u32>,

    /// Absolute URL of the product's detail page
    pub detail_url: Url,

    /// Absolute URL of the product image, or empty when the entry has none
    pub image_url: String,
}

/// Strips everything but digits and the decimal point, then parses the rest
///
/// Returns `None` when nothing numeric remains or the leftover characters do
/// not form a valid number (e.g. `"1.2.3"`).
///
/// # Example
///
/// ```
/// use shelf_crawler::record::parse_price;
///
/// assert_eq!(parse_price("£51.77"), Some(51.77));
/// assert_eq!(parse_price("n/a"), None);
/// ```
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|p| p.is_finite())
}
