//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with a browser user agent
//! - GET requests with per-attempt connect and read timeouts
//! - Retry with exponential backoff for transient failures
//! - Classifying the response by media type

use crate::config::TimeoutConfig;
use crate::crawler::media::{ClassifiedResponse, MediaKind};
use crate::crawler::retry::RetryPolicy;
use crate::{AttemptError, FetchError};
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::Client;

/// Browser user agents; one is picked per client
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Picks a user agent from the pool
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
}

/// Builds an HTTP client with proper configuration
///
/// Certificate validation is disabled: the crawler archives whatever the site
/// serves, including hosts with self-signed or expired certificates. Redirects
/// follow reqwest's default policy (up to 10 hops).
///
/// # Arguments
///
/// * `config` - Connect and read timeouts
/// * `user_agent` - Value of the `User-Agent` header for every request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &TimeoutConfig, user_agent: &str) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .connect_timeout(config.connect_timeout())
        .read_timeout(config.read_timeout())
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetch client shared by every worker of a crawl
///
/// Cloning is cheap: the underlying `reqwest::Client` is reference counted and
/// keeps one connection pool for all clones.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    policy: RetryPolicy,
    user_agent: &'static str,
}

impl FetchClient {
    /// Builds a client with a user agent drawn from the pool
    pub fn new(config: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let user_agent = random_user_agent();
        let client = build_http_client(config, user_agent)?;
        tracing::debug!("HTTP client ready, User-Agent: {}", user_agent);

        Ok(Self {
            client,
            policy: RetryPolicy::from_config(config),
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches a URL, retrying transient failures
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 404 | Immediate -> `FetchError::NotFound` |
    /// | Any other status >= 400 | Retry after `base * 2^attempt` |
    /// | Connect/read timeout, reset, body read failure | Retry after `base * 2^attempt` |
    /// | `max-retries` attempts failed | `FetchError::RetriesExhausted` with the last error |
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Returns
    ///
    /// The response with its body read and media kind decided
    pub async fn fetch(&self, url: &str) -> Result<ClassifiedResponse, FetchError> {
        let mut attempt = 0;

        loop {
            let err = match self.attempt(url).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if !err.is_transient() {
                tracing::warn!("Page not found: {}", url);
                return Err(FetchError::NotFound {
                    url: url.to_string(),
                });
            }

            if !self.policy.has_next(attempt) {
                tracing::error!("Max retries reached for {}: {}", url, err);
                return Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt + 1,
                    source: err,
                });
            }

            let delay = self.policy.delay_for(attempt);
            tracing::warn!(
                "Retrying {} ({}/{}) in {:?} due to: {}",
                url,
                attempt + 1,
                self.policy.max_retries,
                delay,
                err
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, url: &str) -> Result<ClassifiedResponse, AttemptError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(AttemptError::Status(status));
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let kind = MediaKind::from_content_type(content_type.as_deref());

        let body = response.bytes().await.map_err(AttemptError::Transport)?;

        Ok(ClassifiedResponse {
            url: url.to_string(),
            final_url,
            status,
            content_type,
            kind,
            body,
        })
    }
}
