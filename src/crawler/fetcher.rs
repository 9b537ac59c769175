//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the identifying user agent and request timeout
//! - GET requests with a bounded, fixed-delay retry policy
//! - Classifying each attempt as success or a transient failure

use crate::config::{Config, FetchConfig, UserAgentConfig};
use crate::CrawlError;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;
use url::Url;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: Url,
    /// HTTP status code (always 200)
    pub status_code: u16,
    /// Page body content
    pub body: String,
}

/// Why a single attempt did not produce a page
///
/// Never leaves the fetcher: every transient failure is retried, and only
/// running out of attempts is reported to the caller.
#[derive(Debug)]
enum TransientFetchFailure {
    /// The server answered with something other than 200
    Status(StatusCode),
    /// Timeout, connection error, or a body that could not be read
    Transport(reqwest::Error),
}

impl fmt::Display for TransientFetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status code {}", status.as_u16()),
            Self::Transport(e) if e.is_timeout() => write!(f, "request timeout: {}", e),
            Self::Transport(e) if e.is_connect() => write!(f, "connection error: {}", e),
            Self::Transport(e) => write!(f, "request failed: {}", e),
        }
    }
}

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    /// Creates a retry policy
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Total attempts per URL; values below 1 are raised to 1
    /// * `delay` - Pause between two attempts (none after the last)
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Reads `max-attempts` and `retry-delay-ms` from the `[fetch]` section
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Upper bound for a single request, independent of retry delays
///
/// # Example
///
/// ```no_run
/// use shelf_crawler::config::UserAgentConfig;
/// use shelf_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// GET with retries
///
/// Cloning is cheap: the underlying [`Client`] is reference counted.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    /// Creates a fetcher from a prepared client
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client carrying the user agent and request timeout
    /// * `policy` - Retry policy applied to every [`Fetcher::fetch`] call
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds the client and retry policy described by the configuration
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let timeout = Duration::from_secs(config.fetch.request_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;
        Ok(Self::new(client, RetryPolicy::from_config(&config.fetch)))
    }

    /// The underlying HTTP client, shared with the robots.txt probe
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches a URL, retrying non-200 responses and transport errors
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | Return immediately |
    /// | Any other status | Log, wait, retry |
    /// | Timeout / connection error | Log, wait, retry |
    /// | Attempts exhausted | `CrawlError::FetchExhausted` |
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlError> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            tracing::debug!("Requesting {} (attempt {}/{})", url, attempt, max_attempts);

            match self.attempt(url).await {
                Ok(page) => return Ok(page),
                Err(failure) => {
                    tracing::warn!("{} for {} (attempt {})", failure, url, attempt);
                }
            }

            if attempt < max_attempts && !self.policy.delay.is_zero() {
                tokio::time::sleep(self.policy.delay).await;
            }
        }

        Err(CrawlError::FetchExhausted {
            url: url.to_string(),
            attempts: max_attempts,
        })
    }

    /// Performs a single GET and reads the body
    async fn attempt(&self, url: &Url) -> Result<FetchedPage, TransientFetchFailure> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(TransientFetchFailure::Transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(TransientFetchFailure::Status(status));
        }

        let body = response
            .text()
            .await
            .map_err(TransientFetchFailure::Transport)?;

        Ok(FetchedPage {
            url: url.clone(),
            status_code: status.as_u16(),
            body,
        })
    }
}
