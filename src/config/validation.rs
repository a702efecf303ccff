use crate::config::types::{
    Config, CrawlerConfig, DomainConfig, ExcludedConfig, FilesConfig, PdfConfig, TimeoutConfig,
};
use crate::ConfigError;
use url::Url;

/// Longest pause between batches, in seconds
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_domain_config(&config.domain)?;
    validate_excluded_config(&config.excluded)?;
    validate_timeout_config(&config.timeouts)?;
    validate_crawler_config(&config.crawler)?;
    validate_files_config(&config.files)?;
    validate_pdf_config(&config.pdf)?;
    Ok(())
}

/// Validates the crawl scope and start URL
fn validate_domain_config(config: &DomainConfig) -> Result<(), ConfigError> {
    validate_domain_string(&config.name)?;

    let url = Url::parse(&config.start_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid start-url '{}': {}", config.start_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url '{}' must use http or https",
            config.start_url
        )));
    }

    let host = url.host_str().unwrap_or_default().to_lowercase();
    if !host.contains(&config.name.to_lowercase()) {
        return Err(ConfigError::Validation(format!(
            "start-url host '{}' is outside the crawl domain '{}'",
            host, config.name
        )));
    }

    Ok(())
}

fn validate_excluded_config(config: &ExcludedConfig) -> Result<(), ConfigError> {
    if config.patterns.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidPattern(
            "excluded patterns cannot be empty strings".to_string(),
        ));
    }

    if config.extensions.iter().any(|e| e.is_empty()) {
        return Err(ConfigError::InvalidPattern(
            "excluded extensions cannot be empty strings".to_string(),
        ));
    }

    Ok(())
}

fn validate_timeout_config(config: &TimeoutConfig) -> Result<(), ConfigError> {
    if config.connect < 1 || config.read < 1 {
        return Err(ConfigError::Validation(format!(
            "connect and read timeouts must be >= 1s, got {}s and {}s",
            config.connect, config.read
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(
            "max-retries must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.max_queue_size < 1 {
        return Err(ConfigError::Validation(
            "max-queue-size must be >= 1".to_string(),
        ));
    }

    if !config.delay_min.is_finite() || !config.delay_max.is_finite() || config.delay_min < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay bounds must be finite and non-negative, got {} and {}",
            config.delay_min, config.delay_max
        )));
    }

    if config.delay_min > config.delay_max {
        return Err(ConfigError::Validation(format!(
            "delay-min ({}) cannot exceed delay-max ({})",
            config.delay_min, config.delay_max
        )));
    }

    if config.delay_max > MAX_DELAY_SECS {
        return Err(ConfigError::Validation(format!(
            "delay-max cannot exceed {}s, got {}",
            MAX_DELAY_SECS, config.delay_max
        )));
    }

    Ok(())
}

fn validate_files_config(config: &FilesConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    // Room for at least a few characters of name plus the "_xxxxxxxx" hash suffix
    if config.max_length < 16 {
        return Err(ConfigError::Validation(format!(
            "max-length must be >= 16, got {}",
            config.max_length
        )));
    }

    if config.max_url_length < 16 {
        return Err(ConfigError::Validation(format!(
            "max-url-length must be >= 16, got {}",
            config.max_url_length
        )));
    }

    if matches!(&config.log_dir, Some(dir) if dir.is_empty()) {
        return Err(ConfigError::Validation(
            "log-dir cannot be empty when set".to_string(),
        ));
    }

    if config.max_log_files < 1 {
        return Err(ConfigError::Validation(
            "max-log-files must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_pdf_config(config: &PdfConfig) -> Result<(), ConfigError> {
    if !config.ocr_enabled {
        return Ok(());
    }

    if config.ocr_languages.is_empty() {
        return Err(ConfigError::Validation(
            "ocr-languages cannot be empty when OCR is enabled".to_string(),
        ));
    }

    for lang in &config.ocr_languages {
        if lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Validation(format!(
                "Invalid OCR language code '{}'",
                lang
            )));
        }
    }

    if !(72..=1200).contains(&config.ocr_dpi) {
        return Err(ConfigError::Validation(format!(
            "ocr-dpi must be between 72 and 1200, got {}",
            config.ocr_dpi
        )));
    }

    if config.ocr_timeout < 1 {
        return Err(ConfigError::Validation(
            "ocr-timeout must be >= 1s".to_string(),
        ));
    }

    Ok(())
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domain(name: &str, start_url: &str) -> DomainConfig {
        DomainConfig {
            name: name.to_string(),
            start_url: start_url.to_string(),
        }
    }

    fn crawler(max_workers: usize, delay_min: f64, delay_max: f64) -> CrawlerConfig {
        CrawlerConfig {
            max_workers,
            max_queue_size: 100,
            delay_min,
            delay_max,
            checkpoint_interval: 0,
        }
    }

    #[test]
    fn test_validate_domain_string() {
        assert!(validate_domain_string("example.com").is_ok());
        assert!(validate_domain_string("sub.example.com").is_ok());
        assert!(validate_domain_string("127.0.0.1").is_ok());

        assert!(validate_domain_string("").is_err());
        assert!(validate_domain_string("example").is_err());
        assert!(validate_domain_string(".example.com").is_err());
        assert!(validate_domain_string("example.com.").is_err());
        assert!(validate_domain_string("exa mple.com").is_err());
    }

    #[test]
    fn test_start_url_must_be_in_scope() {
        assert!(validate_domain_config(&domain("example.com", "https://www.example.com/")).is_ok());
        assert!(matches!(
            validate_domain_config(&domain("example.com", "https://other.org/")),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_start_url_scheme() {
        assert!(matches!(
            validate_domain_config(&domain("example.com", "ftp://example.com/")),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_domain_config(&domain("example.com", "not a url")),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_worker_bounds() {
        assert!(validate_crawler_config(&crawler(1, 0.0, 0.0)).is_ok());
        assert!(validate_crawler_config(&crawler(100, 0.0, 0.0)).is_ok());
        assert!(validate_crawler_config(&crawler(0, 0.0, 0.0)).is_err());
        assert!(validate_crawler_config(&crawler(101, 0.0, 0.0)).is_err());
    }

    #[test]
    fn test_delay_bounds() {
        assert!(validate_crawler_config(&crawler(4, 1.0, 3.0)).is_ok());
        assert!(validate_crawler_config(&crawler(4, 3.0, 1.0)).is_err());
        assert!(validate_crawler_config(&crawler(4, -1.0, 1.0)).is_err());
        assert!(validate_crawler_config(&crawler(4, 0.0, f64::INFINITY)).is_err());
        assert!(validate_crawler_config(&crawler(4, 0.0, MAX_DELAY_SECS)).is_ok());
        assert!(validate_crawler_config(&crawler(4, 0.0, 1e300)).is_err());
    }

    #[test]
    fn test_ocr_languages() {
        let mut config = PdfConfig::default();
        assert!(validate_pdf_config(&config).is_ok());

        config.ocr_languages = vec!["fra".to_string(), "eng".to_string()];
        assert!(validate_pdf_config(&config).is_ok());

        config.ocr_languages = vec!["fra; rm -rf".to_string()];
        assert!(validate_pdf_config(&config).is_err());

        config.ocr_languages.clear();
        assert!(validate_pdf_config(&config).is_err());

        config.ocr_enabled = false;
        assert!(validate_pdf_config(&config).is_ok());
    }
}
