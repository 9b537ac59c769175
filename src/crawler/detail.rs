//! Detail page parser
//!
//! Reads the available quantity from a product's detail page, e.g.
//! `In stock (22 available)` yields `22`.

use crate::crawler::parser::element_text;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

fn digit_run() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("digit pattern is valid"))
}

/// Extracts the first run of digits from the availability element
///
/// Returns `None` when the element is missing, holds no digits, or the number
/// does not fit in a `u32`. Never fails.
///
/// # Example
///
/// ```
/// use shelf_crawler::crawler::parse_availability;
/// use scraper::Selector;
///
/// let selector = Selector::parse("p.instock.availability").unwrap();
/// let html = r#"<p class="instock availability">In stock (22 available)</p>"#;
/// assert_eq!(parse_availability(html, &selector), Some(22));
/// ```
pub fn parse_availability(html: &str, availability: &Selector) -> Option<u32> {
    let document = Html::parse_document(html);
    let element = document.select(availability).next()?;
    let text = element_text(element);

    digit_run()
        .find(&text)
        .and_then(|m| m.as_str().parse::<u32>().ok())
}
