use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Tidemark
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub domain: DomainConfig,
    #[serde(default)]
    pub excluded: ExcludedConfig,
    pub timeouts: TimeoutConfig,
    pub crawler: CrawlerConfig,
    pub files: FilesConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
}

impl Config {
    /// Directory all artifacts and the checkpoint of this crawl live under
    ///
    /// Laid out as `<base>/<files.output-dir>/<domain.name>` so that crawls of
    /// different sites sharing one output directory never collide.
    pub fn crawl_root(&self, base: &Path) -> PathBuf {
        base.join(&self.files.output_dir).join(&self.domain.name)
    }
}

/// Crawl scope
#[derive(Debug, Clone, Deserialize)]
pub struct DomainConfig {
    /// Domain name every crawled host must contain (e.g. "example.com")
    pub name: String,

    /// First URL placed in the frontier of a fresh crawl
    #[serde(rename = "start-url")]
    pub start_url: String,
}

/// URL exclusion rules, matched against the lower-cased URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludedConfig {
    /// Substrings that disqualify a URL anywhere they appear
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Suffixes (e.g. ".css") that disqualify a URL
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Network timeouts and retry limits
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// Connect timeout per attempt (seconds)
    pub connect: u64,

    /// Read timeout per attempt (seconds)
    pub read: u64,

    /// Attempts per URL before giving up
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base of the exponential backoff between attempts (milliseconds)
    #[serde(rename = "backoff-base", default = "default_backoff_base")]
    pub backoff_base: u64,
}

impl TimeoutConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base)
    }
}

fn default_backoff_base() -> u64 {
    1000
}

/// Crawl engine behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Worker pool size, which is also the largest batch pulled from the frontier
    #[serde(rename = "max-workers")]
    pub max_workers: usize,

    /// Ceiling on the number of saved pages; the crawl stops once it is reached
    #[serde(rename = "max-queue-size")]
    pub max_queue_size: usize,

    /// Lower bound of the random pause between batches (seconds)
    #[serde(rename = "delay-min")]
    pub delay_min: f64,

    /// Upper bound of the random pause between batches (seconds)
    #[serde(rename = "delay-max")]
    pub delay_max: f64,

    /// Write a checkpoint every N batches (0 = only when the crawl stops)
    #[serde(rename = "checkpoint-interval", default)]
    pub checkpoint_interval: u32,
}

/// Output naming and log file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Sub-directory of the output directory that holds crawl roots
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Maximum length of a generated artifact file name (without extension)
    #[serde(rename = "max-length")]
    pub max_length: usize,

    /// URLs longer than this are never crawled
    #[serde(rename = "max-url-length")]
    pub max_url_length: usize,

    /// Directory for per-run log files; console only when absent
    #[serde(rename = "log-dir", default)]
    pub log_dir: Option<String>,

    /// Number of log files kept in `log-dir`
    #[serde(rename = "max-log-files", default = "default_max_log_files")]
    pub max_log_files: usize,
}

fn default_max_log_files() -> usize {
    5
}

/// PDF text extraction and OCR fallback
#[derive(Debug, Clone, Deserialize)]
pub struct PdfConfig {
    #[serde(rename = "ocr-enabled", default = "default_ocr_enabled")]
    pub ocr_enabled: bool,

    /// Tesseract language codes, joined with '+' on the command line
    #[serde(rename = "ocr-languages", default = "default_ocr_languages")]
    pub ocr_languages: Vec<String>,

    /// Resolution pages are rendered at before OCR
    #[serde(rename = "ocr-dpi", default = "default_ocr_dpi")]
    pub ocr_dpi: u32,

    /// Pages beyond this are not rendered or recognised
    #[serde(rename = "ocr-max-pages", default = "default_ocr_max_pages")]
    pub ocr_max_pages: u32,

    /// Limit for each external render/OCR command (seconds)
    #[serde(rename = "ocr-timeout", default = "default_ocr_timeout")]
    pub ocr_timeout: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            ocr_enabled: default_ocr_enabled(),
            ocr_languages: default_ocr_languages(),
            ocr_dpi: default_ocr_dpi(),
            ocr_max_pages: default_ocr_max_pages(),
            ocr_timeout: default_ocr_timeout(),
        }
    }
}

fn default_ocr_enabled() -> bool {
    true
}

fn default_ocr_languages() -> Vec<String> {
    vec!["fra".to_string()]
}

fn default_ocr_dpi() -> u32 {
    300
}

fn default_ocr_max_pages() -> u32 {
    50
}

fn default_ocr_timeout() -> u64 {
    120
}
