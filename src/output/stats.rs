//! Crawl statistics
//!
//! This module provides the counters kept while a crawl runs and an offline
//! inventory of an existing crawl root for the `--stats` command.

use crate::crawler::MediaKind;
use crate::state::CheckpointStore;
use crate::storage::FileCategory;
use crate::{CrawlError, FetchError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::{Duration, Instant};

/// Counters for one crawl run
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Artifacts saved, by media kind
    pub saved_by_kind: HashMap<MediaKind, u64>,

    /// Results dropped because their normalized URL was already seen
    pub duplicates: u64,

    /// URLs refused by the URL policy
    pub rejected: u64,

    /// Responses with a media type the crawler does not keep
    pub unsupported: u64,

    /// URLs answered with 404
    pub not_found: u64,

    /// URLs given up on after every retry, or whose task died
    pub failed: u64,

    /// Artifacts that could not be written
    pub storage_errors: u64,

    /// Links added to the frontier
    pub links_enqueued: u64,

    pub batches: u64,
    pub checkpoints: u64,

    started: Instant,
}

impl Default for CrawlStatistics {
    fn default() -> Self {
        Self {
            saved_by_kind: HashMap::new(),
            duplicates: 0,
            rejected: 0,
            unsupported: 0,
            not_found: 0,
            failed: 0,
            storage_errors: 0,
            links_enqueued: 0,
            batches: 0,
            checkpoints: 0,
            started: Instant::now(),
        }
    }
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_saved(&mut self, kind: MediaKind) {
        *self.saved_by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicates += 1;
    }

    pub fn record_rejected(&mut self) {
        self.rejected += 1;
    }

    pub fn record_unsupported(&mut self) {
        self.unsupported += 1;
    }

    pub fn record_fetch_error(&mut self, error: &FetchError) {
        match error {
            FetchError::NotFound { .. } => self.not_found += 1,
            FetchError::RetriesExhausted { .. } => self.failed += 1,
        }
    }

    /// A task that panicked or was aborted
    pub fn record_task_failure(&mut self) {
        self.failed += 1;
    }

    pub fn record_storage_error(&mut self) {
        self.storage_errors += 1;
    }

    pub fn record_links_enqueued(&mut self, count: usize) {
        self.links_enqueued += count as u64;
    }

    pub fn record_batch(&mut self) {
        self.batches += 1;
    }

    pub fn record_checkpoint(&mut self) {
        self.checkpoints += 1;
    }

    pub fn saved(&self, kind: MediaKind) -> u64 {
        self.saved_by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_saved(&self) -> u64 {
        self.saved_by_kind.values().sum()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Saved artifacts per second since the run started
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.total_saved() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Prints run statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Elapsed: {:.1}s", stats.elapsed().as_secs_f64());
    println!("  Batches: {}", stats.batches);
    println!("  Checkpoints written: {}", stats.checkpoints);
    println!("  Links queued: {}", stats.links_enqueued);
    println!();

    println!("Saved ({} total, {:.2}/sec):", stats.total_saved(), stats.rate());
    for kind in [
        MediaKind::Html,
        MediaKind::Pdf,
        MediaKind::Image,
        MediaKind::Document,
    ] {
        println!("  {}: {}", kind, stats.saved(kind));
    }
    println!();

    println!("Skipped:");
    println!("  Duplicates: {}", stats.duplicates);
    println!("  Rejected by URL policy: {}", stats.rejected);
    println!("  Unsupported content type: {}", stats.unsupported);
    println!();

    println!("Errors:");
    println!("  Not found (404): {}", stats.not_found);
    println!("  Failed after retries: {}", stats.failed);
    println!("  Storage errors: {}", stats.storage_errors);
}

/// Summary of the checkpoint found in a crawl root
#[derive(Debug, Clone)]
pub struct CheckpointSummary {
    pub seen: usize,
    pub queued: usize,
    pub timestamp: DateTime<Utc>,
}

/// What an existing crawl root holds on disk
#[derive(Debug, Clone, Default)]
pub struct OutputInventory {
    pub checkpoint: Option<CheckpointSummary>,

    /// Files in `text/`
    pub text_files: u64,

    /// Files in each `files/<category>/`, categories with no files omitted
    pub files_by_category: BTreeMap<String, u64>,
}

impl OutputInventory {
    pub fn total_files(&self) -> u64 {
        self.files_by_category.values().sum()
    }
}

/// Loads the inventory of a crawl root
///
/// # Arguments
///
/// * `crawl_root` - The crawl root (`<output>/<output-dir>/<domain>`)
///
/// # Returns
///
/// * `Ok(OutputInventory)` - Successfully read the crawl root
/// * `Err(CrawlError)` - The root does not exist, or its checkpoint is unreadable
pub fn load_statistics(crawl_root: &Path) -> Result<OutputInventory, CrawlError> {
    if !crawl_root.is_dir() {
        return Err(CrawlError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no crawl output at {}", crawl_root.display()),
        )));
    }

    let checkpoint = CheckpointStore::new(crawl_root)
        .load()?
        .map(|state| CheckpointSummary {
            seen: state.seen_urls.len(),
            queued: state.queue.len(),
            timestamp: state.timestamp,
        });

    let text_files = count_files(&crawl_root.join("text"))?;

    let mut files_by_category = BTreeMap::new();
    for category in FileCategory::ALL {
        let count = count_files(&crawl_root.join("files").join(category.as_str()))?;
        if count > 0 {
            files_by_category.insert(category.as_str().to_string(), count);
        }
    }

    Ok(OutputInventory {
        checkpoint,
        text_files,
        files_by_category,
    })
}

/// Prints a crawl root inventory to stdout
pub fn print_inventory(inventory: &OutputInventory) {
    println!("=== Crawl Output ===\n");

    match &inventory.checkpoint {
        Some(checkpoint) => {
            println!("Checkpoint ({}):", checkpoint.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
            println!("  URLs saved: {}", checkpoint.seen);
            println!("  URLs queued: {}", checkpoint.queued);
        }
        None => println!("Checkpoint: none"),
    }
    println!();

    println!("Text files: {}", inventory.text_files);
    println!("Binary files: {}", inventory.total_files());
    for (category, count) in &inventory.files_by_category {
        println!("  {}: {}", category, count);
    }
}

fn count_files(dir: &Path) -> Result<u64, CrawlError> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        if entry?.file_type()?.is_file() {
            count += 1;
        }
    }
    Ok(count)
}
