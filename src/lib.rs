//! Tidemark: a bounded, resumable site crawler
//!
//! This crate crawls a single site breadth-first, classifies every response by media
//! type, stores extracted text and binaries on disk, and checkpoints its frontier so
//! an interrupted crawl can be resumed without re-fetching pages it already saved.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for Tidemark operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Checkpoint error: {0}")]
    State(#[from] state::StateError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid engine transition: {from} -> {to}")]
    InvalidTransition {
        from: state::EngineState,
        to: state::EngineState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// A single failed request attempt
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("HTTP status {0}")]
    Status(StatusCode),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

impl AttemptError {
    /// Returns true if another attempt could plausibly succeed
    ///
    /// Everything except a 404 is worth retrying: 5xx responses, throttling,
    /// timeouts and connection resets all clear up on their own.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Status(status) if *status == StatusCode::NOT_FOUND)
    }
}

/// Terminal outcome of fetching a URL
///
/// Transient failures are retried inside the fetch client and never surface on
/// their own; only these two cases reach the crawl engine.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Page not found: {url}")]
    NotFound { url: String },

    #[error("Gave up on {url} after {attempts} attempts: {source}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: AttemptError,
    },
}

impl FetchError {
    /// The URL the failed fetch was for
    pub fn url(&self) -> &str {
        match self {
            Self::NotFound { url } | Self::RetriesExhausted { url, .. } => url,
        }
    }
}

/// Result type alias for Tidemark operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, CrawlOutcome, CrawlReport, StopReason};
pub use state::{CrawlState, EngineState};
pub use crate::url::{normalize_url, sanitize_filename, UrlPolicy};
