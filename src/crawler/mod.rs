//! Crawler module for fetching, extracting and storing pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and exponential backoff
//! - Media classification of responses
//! - HTML text and link extraction, PDF text with an OCR fallback
//! - The frontier and its dedup set
//! - Overall crawl coordination and graceful shutdown

mod coordinator;
mod fetcher;
mod frontier;
mod media;
mod parser;
mod pdf;
mod retry;
mod shutdown;

pub use coordinator::{BatchStatus, Coordinator, CrawlOutcome, CrawlReport, StopReason};
pub use fetcher::{build_http_client, random_user_agent, FetchClient, USER_AGENTS};
pub use frontier::Frontier;
pub use media::{ClassifiedResponse, ExtractedContent, MediaKind, TaskOutcome};
pub use parser::{extract_links, extract_text};
pub use pdf::{PdfError, PdfExtractor};
pub use retry::RetryPolicy;
pub use shutdown::{shutdown_signal, spawn_signal_listener};

use crate::config::Config;
use crate::state::EngineState;
use crate::Result;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Create the crawl root under `output_base`
/// 2. Restore the checkpoint (with `resume`) or seed the start URL
/// 3. Fetch, extract and save pages batch by batch
/// 4. Follow in-scope links until the frontier empties or the seen limit is hit
/// 5. Write a final checkpoint
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `output_base` - Base output directory; the crawl root is `<output_base>/<output-dir>/<domain>`
/// * `resume` - Continue from the checkpoint in the crawl root
/// * `shutdown` - Cancelling this token stops the crawl after a checkpoint
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed or was interrupted cleanly
/// * `Err(CrawlError)` - Crawl could not be set up or failed
pub async fn crawl(
    config: Config,
    output_base: &Path,
    resume: bool,
    shutdown: CancellationToken,
) -> Result<CrawlReport> {
    let crawl_root = config.crawl_root(output_base);
    let mut coordinator = Coordinator::new(config, &crawl_root, resume, shutdown)?;

    match coordinator.run().await {
        Ok(outcome) => Ok(CrawlReport {
            outcome,
            statistics: coordinator.statistics().clone(),
            crawl_root,
        }),
        Err(e) => {
            tracing::error!("Crawl aborted: {}", e);
            // Nothing was loaded if the engine never left Idle
            if coordinator.state() != EngineState::Idle {
                if let Err(save_err) = coordinator.save_checkpoint() {
                    tracing::error!("Failed to save checkpoint: {}", save_err);
                }
            }
            Err(e)
        }
    }
}
