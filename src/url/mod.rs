//! URL handling module for Tidemark
//!
//! This module provides URL normalization, domain scoping, exclusion rules and
//! file name derivation for saved artifacts.

mod domain;
mod normalize;
mod sanitize;

use crate::config::Config;

// Re-export main functions
pub use domain::{extract_domain, in_scope, netloc};
pub use normalize::{normalize_url, parse_http_url};
pub use sanitize::sanitize_filename;

/// Decides which URLs the crawler is allowed to fetch
///
/// A URL is *valid* when it is a non-empty `http`/`https` URL no longer than the
/// configured limit whose host contains the crawl domain. It is *processable*
/// when it is valid and, once lower-cased, contains none of the excluded
/// patterns and ends with none of the excluded extensions.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    domain: String,
    excluded_patterns: Vec<String>,
    excluded_extensions: Vec<String>,
    max_url_length: usize,
}

impl UrlPolicy {
    /// Creates a policy; patterns and extensions are matched case-insensitively
    pub fn new(
        domain: impl Into<String>,
        excluded_patterns: &[String],
        excluded_extensions: &[String],
        max_url_length: usize,
    ) -> Self {
        Self {
            domain: domain.into().to_lowercase(),
            excluded_patterns: excluded_patterns.iter().map(|p| p.to_lowercase()).collect(),
            excluded_extensions: excluded_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            max_url_length,
        }
    }

    /// Builds the policy described by a crawl configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.domain.name.clone(),
            &config.excluded.patterns,
            &config.excluded.extensions,
            config.files.max_url_length,
        )
    }

    /// The crawl domain, lower-cased
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Checks the URL's shape and scope
    ///
    /// # Returns
    ///
    /// * `true` - Non-empty, within the length limit, `http`/`https` with a host
    ///   that contains the crawl domain
    /// * `false` - Otherwise
    pub fn is_valid(&self, url: &str) -> bool {
        if url.is_empty() || url.len() > self.max_url_length {
            return false;
        }

        match parse_http_url(url) {
            Ok(parsed) => in_scope(&parsed, &self.domain),
            Err(_) => false,
        }
    }

    /// Checks exclusion rules, then validity
    ///
    /// # Examples
    ///
    /// ```
    /// use tidemark::UrlPolicy;
    ///
    /// let policy = UrlPolicy::new(
    ///     "example.com",
    ///     &["/login".to_string()],
    ///     &[".css".to_string()],
    ///     2000,
    /// );
    ///
    /// assert!(policy.should_process("https://www.example.com/docs"));
    /// assert!(!policy.should_process("https://example.com/LOGIN?next=/"));
    /// assert!(!policy.should_process("https://example.com/site.css"));
    /// assert!(!policy.should_process("https://example.org/docs"));
    /// ```
    pub fn should_process(&self, url: &str) -> bool {
        let lower = url.to_lowercase();

        if self
            .excluded_patterns
            .iter()
            .any(|pattern| lower.contains(pattern.as_str()))
        {
            return false;
        }

        if self
            .excluded_extensions
            .iter()
            .any(|ext| lower.ends_with(ext.as_str()))
        {
            return false;
        }

        self.is_valid(url)
    }
}
