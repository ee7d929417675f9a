//! Article fetching with bounded retries.
//!
//! Uses reqwest for fetching; HTML parsing lives in [`crate::extract`].
//! Transport failures and 5xx responses are retried after a fixed, non-blocking
//! delay. 4xx responses fail on the first attempt.

use crate::config::FetchConfig;
use crate::extract;
use crate::summary::ArticleContent;
use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Below this many characters the article is probably a paywall or an error page
pub const MIN_CONTENT_CHARS: usize = 500;

const MAX_REDIRECTS: usize = 10;

/// Why a fetch failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    InvalidUrl(String),
    Status(u16),
    Timeout(String),
    Connection(String),
    /// Redirect loop or too many hops
    Redirect(String),
}

impl FetchCause {
    /// Timeouts, connection errors and 5xx responses are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchCause::Status(status) => (500..600).contains(status),
            FetchCause::Timeout(_) | FetchCause::Connection(_) => true,
            FetchCause::InvalidUrl(_) | FetchCause::Redirect(_) => false,
        }
    }
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchCause::InvalidUrl(detail) => write!(f, "invalid URL: {}", detail),
            FetchCause::Status(status) => write!(f, "HTTP error {}", status),
            FetchCause::Timeout(detail) => write!(f, "timed out: {}", detail),
            FetchCause::Connection(detail) => write!(f, "connection error: {}", detail),
            FetchCause::Redirect(detail) => write!(f, "redirect error: {}", detail),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to fetch {url} after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        self.cause.is_retryable()
    }

    /// True for failures caused by the request itself (bad URL, redirect loop, 4xx)
    pub fn is_client_error(&self) -> bool {
        match &self.cause {
            FetchCause::InvalidUrl(_) | FetchCause::Redirect(_) => true,
            FetchCause::Status(status) => (400..500).contains(status),
            _ => false,
        }
    }
}

/// A response as seen by the fetcher
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// The single network operation the fetcher needs.
///
/// Implementations return `Ok` for any HTTP response, including error statuses,
/// and `Err` only when no response was obtained.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchCause>;
}

/// reqwest-backed transport that follows redirects and sends a browser User-Agent
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchCause> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchCause::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchCause> {
        let response = self.client.get(url).send().await.map_err(classify)?;
        let status = response.status().as_u16();
        // text() decodes lossily, so a failure here means the body stream broke
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchCause::Timeout(e.to_string())
            } else {
                FetchCause::Connection(e.to_string())
            }
        })?;
        Ok(HttpResponse { status, body })
    }
}

fn classify(error: reqwest::Error) -> FetchCause {
    if error.is_timeout() {
        FetchCause::Timeout(error.to_string())
    } else if error.is_redirect() {
        FetchCause::Redirect(error.to_string())
    } else if error.is_builder() {
        FetchCause::InvalidUrl(error.to_string())
    } else {
        FetchCause::Connection(error.to_string())
    }
}

/// Retry settings for one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl From<&FetchConfig> for FetchPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
        }
    }
}

/// Raw page returned by a successful fetch
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
}

/// Fetches article HTML through an [`HttpTransport`] with retries
pub struct ContentFetcher<T = ReqwestTransport> {
    transport: T,
    policy: FetchPolicy,
}

impl ContentFetcher<ReqwestTransport> {
    /// Build a reqwest-backed fetcher from configuration
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let transport =
            ReqwestTransport::new(&config.user_agent, config.timeout()).map_err(|cause| {
                FetchError {
                    url: String::new(),
                    attempts: 0,
                    cause,
                }
            })?;
        Ok(Self::new(transport, FetchPolicy::from(config)))
    }
}

impl<T: HttpTransport> ContentFetcher<T> {
    pub fn new(transport: T, policy: FetchPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> FetchPolicy {
        self.policy
    }

    /// Fetch the raw HTML at `url`
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch_with(url, self.policy).await
    }

    /// Fetch with an explicit retry policy
    pub async fn fetch_with(&self, url: &str, policy: FetchPolicy) -> Result<FetchedPage, FetchError> {
        validate_url(url).map_err(|cause| FetchError {
            url: url.to_string(),
            attempts: 0,
            cause,
        })?;

        let max_attempts = policy.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let cause = match self.transport.get(url).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    tracing::debug!(url, attempt, bytes = response.body.len(), "fetched page");
                    return Ok(FetchedPage {
                        url: url.to_string(),
                        html: response.body,
                    });
                }
                Ok(response) => FetchCause::Status(response.status),
                Err(cause) => cause,
            };

            if !cause.is_retryable() || attempt >= max_attempts {
                tracing::error!(url, attempt, %cause, "giving up on fetch");
                return Err(FetchError {
                    url: url.to_string(),
                    attempts: attempt,
                    cause,
                });
            }

            tracing::warn!(
                url,
                attempt,
                max_attempts,
                %cause,
                "fetch failed, retrying in {:?}",
                policy.retry_delay
            );
            tokio::time::sleep(policy.retry_delay).await;
        }
    }

    /// Fetch `url` and reduce it to article text
    pub async fn fetch_content(&self, url: &str) -> Result<ArticleContent, FetchError> {
        let page = self.fetch(url).await?;
        let content = extract::extract(&page.url, &page.html);
        flag_short_content(&content);
        Ok(content)
    }
}

/// Log articles too short to be real content; they are still summarized
pub fn flag_short_content(content: &ArticleContent) -> bool {
    let chars = content.text.chars().count();
    let short = chars < MIN_CONTENT_CHARS;
    if short {
        tracing::warn!(url = %content.url, chars, "extracted content is unusually short");
    }
    short
}

fn validate_url(raw: &str) -> Result<(), FetchCause> {
    let parsed = url::Url::parse(raw).map_err(|e| FetchCause::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchCause::InvalidUrl(format!("unsupported scheme {}", other))),
    }
}
