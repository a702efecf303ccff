//! Output module for crawl statistics and reports
//!
//! This module handles:
//! - Counting what a crawl run saved, skipped and failed
//! - Printing the run summary
//! - Inventorying an existing crawl root for `--stats`

pub mod stats;

pub use stats::{
    load_statistics, print_inventory, print_statistics, CheckpointSummary, CrawlStatistics,
    OutputInventory,
};
