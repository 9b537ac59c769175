//! Robots.txt probe
//!
//! The crawler fetches robots.txt once at startup and reports what it says.
//! The answer is informational only and never stops the crawl.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use std::time::Duration;
use url::Url;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the startup probe learned
#[derive(Debug, Clone)]
pub struct RobotsProbe {
    /// HTTP status of the robots.txt request
    pub status_code: u16,
    /// Whether the start URL is allowed for our agent
    pub start_allowed: bool,
    /// Crawl-delay for our agent, in seconds
    pub crawl_delay: Option<f64>,
}

/// Locates robots.txt for the origin of `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    url.join("/robots.txt").ok()
}

/// Fetches robots.txt once and logs the result
///
/// Single attempt with a short timeout. Returns `None` when the request fails.
pub async fn probe_robots(client: &Client, start_url: &Url, agent: &str) -> Option<RobotsProbe> {
    let robots_url = robots_url(start_url)?;

    let response = match client.get(robots_url.clone()).timeout(PROBE_TIMEOUT).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Could not fetch {}; proceeding carefully: {}", robots_url, e);
            return None;
        }
    };

    let status_code = response.status().as_u16();
    tracing::info!("robots.txt status: {}", status_code);

    let content = if response.status().is_success() {
        response.text().await.unwrap_or_default()
    } else {
        String::new()
    };

    let robots = ParsedRobots::from_content(&content);
    let probe = RobotsProbe {
        status_code,
        start_allowed: robots.is_allowed(start_url.as_str(), agent),
        crawl_delay: robots.crawl_delay(agent),
    };

    if !probe.start_allowed {
        tracing::warn!("robots.txt disallows {} for {}", start_url, agent);
    }
    if let Some(delay) = probe.crawl_delay {
        tracing::info!("robots.txt requests a crawl delay of {}s", delay);
    }

    Some(probe)
}
