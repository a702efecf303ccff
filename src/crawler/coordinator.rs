//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Seeding or restoring the frontier
//! - Dispatching batches of URLs to worker tasks
//! - Deduplicating results, saving artifacts and queueing new links
//! - Periodic and final checkpoints
//! - Handling interrupts
//!
//! The coordinator is the only owner of the frontier. Workers run as spawned
//! tasks that fetch and extract one URL each and hand back a [`TaskOutcome`];
//! every mutation of crawl state happens here, on the control task, after a
//! worker's result arrives.

use crate::config::{Config, MAX_DELAY_SECS};
use crate::crawler::fetcher::FetchClient;
use crate::crawler::frontier::Frontier;
use crate::crawler::media::{ExtractedContent, MediaKind, TaskOutcome};
use crate::crawler::parser::{extract_links, extract_text};
use crate::crawler::pdf::PdfExtractor;
use crate::output::CrawlStatistics;
use crate::state::{CheckpointStore, EngineState, StateError};
use crate::storage::{ArtifactSink, FsArtifactSink};
use crate::url::{normalize_url, UrlPolicy};
use crate::{CrawlError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Why a crawl finished on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No URL left to visit
    FrontierExhausted,
    /// The seen-set reached `max-queue-size`
    SeenLimitReached,
}

/// How a crawl run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    Completed(StopReason),
    /// Stopped by the shutdown token; in-flight URLs were dropped
    Interrupted,
}

/// Result of dispatching one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every task of the batch reported back
    Completed { dispatched: usize },
    /// Shutdown was requested while tasks were in flight
    Interrupted,
}

/// What a finished [`crate::crawl`] call reports
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub outcome: CrawlOutcome,
    pub statistics: CrawlStatistics,
    pub crawl_root: PathBuf,
}

/// Everything a worker task needs, shared read-only across the pool
struct WorkerContext {
    fetcher: FetchClient,
    policy: UrlPolicy,
    pdf: PdfExtractor,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    ctx: Arc<WorkerContext>,
    sink: Arc<dyn ArtifactSink>,
    frontier: Frontier,
    checkpoint: CheckpointStore,
    state: EngineState,
    stats: CrawlStatistics,
    shutdown: CancellationToken,
    resume: bool,
}

impl Coordinator {
    /// Creates a new coordinator instance writing under `crawl_root`
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `crawl_root` - Directory for artifacts and the checkpoint
    /// * `resume` - Restore the frontier from the checkpoint instead of seeding it
    /// * `shutdown` - Token that interrupts the crawl when cancelled
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to `start`, in the `Idle` state
    /// * `Err(CrawlError)` - The output root is not writable or the HTTP client could not be built
    pub fn new(
        config: Config,
        crawl_root: &Path,
        resume: bool,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        std::fs::create_dir_all(crawl_root)?;
        let sink = FsArtifactSink::new(crawl_root, config.files.max_length)?;
        Self::with_sink(config, crawl_root, resume, shutdown, Arc::new(sink))
    }

    /// Creates a coordinator that hands artifacts to a custom sink
    pub fn with_sink(
        config: Config,
        crawl_root: &Path,
        resume: bool,
        shutdown: CancellationToken,
        sink: Arc<dyn ArtifactSink>,
    ) -> Result<Self> {
        let ctx = WorkerContext {
            fetcher: FetchClient::new(&config.timeouts)?,
            policy: UrlPolicy::from_config(&config),
            pdf: PdfExtractor::new(config.pdf.clone()),
        };

        Ok(Self {
            config: Arc::new(config),
            ctx: Arc::new(ctx),
            sink,
            frontier: Frontier::new(),
            checkpoint: CheckpointStore::new(crawl_root),
            state: EngineState::Idle,
            stats: CrawlStatistics::new(),
            shutdown,
            resume,
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }

    pub fn checkpoint_store(&self) -> &CheckpointStore {
        &self.checkpoint
    }

    /// Loads the frontier and moves `Idle -> Running`
    ///
    /// With `resume`, the checkpoint is restored; a missing or corrupt one
    /// falls back to the start URL. Without it, the frontier holds only the
    /// start URL.
    pub fn start(&mut self) -> Result<()> {
        self.transition(EngineState::Running)?;

        let start_url = &self.config.domain.start_url;
        self.frontier = if self.resume {
            Frontier::restore_or_seed(&self.checkpoint, start_url)
        } else {
            Frontier::seeded(start_url)
        };

        tracing::info!(
            "Crawling {} from {} ({} queued, {} already saved)",
            self.config.domain.name,
            start_url,
            self.frontier.queue_len(),
            self.frontier.seen_len()
        );
        Ok(())
    }

    /// Runs the main crawl loop until the crawl ends or is interrupted
    ///
    /// Each iteration:
    /// 1. Stops if shutdown was requested, the frontier is empty, or the seen-set is full
    /// 2. Runs one batch of at most `max-workers` URLs to completion
    /// 3. Writes a checkpoint every `checkpoint-interval` batches
    /// 4. Sleeps a random delay in `[delay-min, delay-max]`
    ///
    /// A final checkpoint is written however the loop ends.
    pub async fn run(&mut self) -> Result<CrawlOutcome> {
        if self.state == EngineState::Idle {
            self.start()?;
        }

        let interval = self.config.crawler.checkpoint_interval as u64;

        let reason = loop {
            if self.shutdown.is_cancelled() {
                return self.shut_down();
            }

            if self.frontier.is_empty() {
                break StopReason::FrontierExhausted;
            }

            if self.frontier.seen_len() >= self.config.crawler.max_queue_size {
                break StopReason::SeenLimitReached;
            }

            if self.run_batch().await? == BatchStatus::Interrupted {
                return self.shut_down();
            }

            if interval > 0 && self.stats.batches % interval == 0 {
                self.checkpoint_or_log();
            }

            if self.stats.batches % 10 == 0 {
                tracing::info!(
                    "Progress: {} saved, {} queued, {:.2} pages/sec",
                    self.frontier.seen_len(),
                    self.frontier.queue_len(),
                    self.stats.rate()
                );
            }

            if !self.pause().await {
                return self.shut_down();
            }
        };

        self.drain(reason)
    }

    /// Dispatches one batch and waits for all of it
    ///
    /// Up to `max-workers` URLs are taken from the frontier. URLs already saved
    /// are dropped without a fetch; the rest run as concurrent tasks, and each
    /// result is handled as soon as it arrives. If the shutdown token fires
    /// first, the remaining tasks are aborted and their URLs are lost for this run.
    pub async fn run_batch(&mut self) -> Result<BatchStatus> {
        if self.state != EngineState::Running {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to: EngineState::Running,
            });
        }

        let mut batch = Vec::new();
        for url in self.frontier.dequeue_batch(self.config.crawler.max_workers) {
            if self.frontier.is_seen(&normalize_url(&url)) {
                tracing::debug!("Already saved, dropping {}", url);
                self.stats.record_duplicate();
            } else {
                batch.push(url);
            }
        }

        let dispatched = batch.len();
        tracing::debug!("Dispatching batch of {} URL(s)", dispatched);

        let mut in_flight = FuturesUnordered::new();
        let mut abort_handles = Vec::with_capacity(dispatched);

        for url in batch {
            let ctx = Arc::clone(&self.ctx);
            let task_url = url.clone();
            let handle = tokio::spawn(async move { process_url(&ctx, &task_url).await });
            abort_handles.push(handle.abort_handle());
            in_flight.push(async move { (url, handle.await) });
        }

        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    for handle in &abort_handles {
                        handle.abort();
                    }
                    tracing::warn!("Abandoning {} in-flight URL(s)", in_flight.len());
                    return Ok(BatchStatus::Interrupted);
                }
                next = in_flight.next() => match next {
                    Some((url, Ok(outcome))) => self.handle_outcome(&url, outcome).await,
                    Some((url, Err(e))) => {
                        tracing::error!("Worker for {} died: {}", url, e);
                        self.stats.record_task_failure();
                    }
                    None => break,
                },
            }
        }

        self.stats.record_batch();
        Ok(BatchStatus::Completed { dispatched })
    }

    /// Writes the current frontier to the checkpoint file
    pub fn save_checkpoint(&mut self) -> std::result::Result<(), StateError> {
        self.checkpoint.save(&self.frontier.snapshot())?;
        self.stats.record_checkpoint();
        tracing::info!(
            "Checkpoint saved: {} seen, {} queued",
            self.frontier.seen_len(),
            self.frontier.queue_len()
        );
        Ok(())
    }

    fn checkpoint_or_log(&mut self) {
        if let Err(e) = self.save_checkpoint() {
            tracing::error!("Failed to save checkpoint: {}", e);
        }
    }

    fn transition(&mut self, next: EngineState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(CrawlError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::debug!("Engine state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    fn drain(&mut self, reason: StopReason) -> Result<CrawlOutcome> {
        self.transition(EngineState::Draining)?;
        match reason {
            StopReason::FrontierExhausted => tracing::info!("Frontier is empty, crawl complete"),
            StopReason::SeenLimitReached => tracing::info!(
                "Reached {} saved URLs, stopping",
                self.config.crawler.max_queue_size
            ),
        }

        self.checkpoint_or_log();
        self.log_summary();
        self.transition(EngineState::Stopped)?;
        Ok(CrawlOutcome::Completed(reason))
    }

    fn shut_down(&mut self) -> Result<CrawlOutcome> {
        self.transition(EngineState::ShuttingDown)?;
        tracing::info!("Shutting down");

        self.checkpoint_or_log();
        self.log_summary();
        self.transition(EngineState::Stopped)?;
        Ok(CrawlOutcome::Interrupted)
    }

    /// Sleeps between batches; returns false if shutdown interrupted the sleep
    async fn pause(&self) -> bool {
        let min = self.config.crawler.delay_min;
        let max = self.config.crawler.delay_max;
        let secs = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };

        if secs <= 0.0 {
            return !self.shutdown.is_cancelled();
        }

        let delay = Duration::try_from_secs_f64(secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(MAX_DELAY_SECS));

        tracing::debug!("Pausing {:.2}s before next batch", delay.as_secs_f64());
        tokio::select! {
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    async fn handle_outcome(&mut self, url: &str, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Extracted(content) => self.handle_result(url, content).await,
            TaskOutcome::Rejected => {
                tracing::debug!("Skipping {} (URL policy)", url);
                self.stats.record_rejected();
            }
            TaskOutcome::Unsupported { content_type } => {
                tracing::info!(
                    "Unsupported content type for {}: {}",
                    url,
                    content_type.as_deref().unwrap_or("none")
                );
                self.stats.record_unsupported();
            }
            TaskOutcome::Failed(e) => {
                tracing::warn!("Skipping {}: {}", url, e);
                self.stats.record_fetch_error(&e);
            }
        }
    }

    /// Saves a result unless its URL was already saved, then follows HTML links
    async fn handle_result(&mut self, url: &str, content: ExtractedContent) {
        let normalized = normalize_url(url);
        if !self.frontier.mark_seen(&normalized) {
            tracing::debug!("Duplicate result for {}", url);
            self.stats.record_duplicate();
            return;
        }

        match self.sink.save(url, &content) {
            Ok(paths) => {
                tracing::debug!("Saved {} -> {} file(s)", url, paths.len());
                self.stats.record_saved(content.kind());
            }
            Err(e) => {
                tracing::error!("Failed to save {}: {}", url, e);
                self.stats.record_storage_error();
            }
        }

        if content.kind() == MediaKind::Html {
            self.queue_new_links(url).await;
        }
    }

    /// Fetches the page again and queues every link that passes the URL policy
    async fn queue_new_links(&mut self, url: &str) {
        let response = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return,
            response = self.ctx.fetcher.fetch(url) => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Could not fetch {} for links: {}", url, e);
                return;
            }
        };

        let mut added = 0;
        for link in extract_links(&response.body, url) {
            if self.ctx.policy.should_process(&link) && self.frontier.enqueue(&link) {
                added += 1;
            }
        }

        if added > 0 {
            tracing::debug!("Queued {} new link(s) from {}", added, url);
        }
        self.stats.record_links_enqueued(added);
    }

    fn log_summary(&self) {
        tracing::info!(
            "Crawl finished in {:.1}s: {} saved this run ({} html, {} pdf, {} image, {} document), {} failed, {} not found, {} still queued",
            self.stats.elapsed().as_secs_f64(),
            self.stats.total_saved(),
            self.stats.saved(MediaKind::Html),
            self.stats.saved(MediaKind::Pdf),
            self.stats.saved(MediaKind::Image),
            self.stats.saved(MediaKind::Document),
            self.stats.failed,
            self.stats.not_found,
            self.frontier.queue_len()
        );
    }
}

/// Fetches and extracts one URL on a worker task
async fn process_url(ctx: &WorkerContext, url: &str) -> TaskOutcome {
    if !ctx.policy.should_process(url) {
        return TaskOutcome::Rejected;
    }

    let response = match ctx.fetcher.fetch(url).await {
        Ok(response) => response,
        Err(e) => return TaskOutcome::Failed(e),
    };

    if response.final_url != response.url {
        tracing::debug!("{} redirected to {}", response.url, response.final_url);
    }

    let content = match response.kind {
        MediaKind::Html => ExtractedContent::Html {
            text: extract_text(&response.body),
        },
        MediaKind::Pdf => ExtractedContent::Pdf {
            text: ctx.pdf.extract_text(response.body.clone()).await,
            bytes: response.body,
        },
        MediaKind::Image => ExtractedContent::Image {
            mime: response.mime(),
            bytes: response.body,
        },
        MediaKind::Document => ExtractedContent::Document {
            mime: response.mime(),
            bytes: response.body,
        },
        MediaKind::Unsupported => {
            return TaskOutcome::Unsupported {
                content_type: response.content_type,
            }
        }
    };

    TaskOutcome::Extracted(content)
}
