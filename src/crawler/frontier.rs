//! Crawl frontier and deduplication set
//!
//! This module handles:
//! - The FIFO queue of URLs still to visit (breadth-first order)
//! - The seen-set of normalized URLs whose content has been saved
//! - Snapshot and restore through the JSON checkpoint
//!
//! The frontier is owned by the engine's control task; workers never touch it.

use crate::state::{CheckpointStore, CrawlState};
use crate::url::normalize_url;
use chrono::Utc;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Pending URLs plus the set of URLs already saved
#[derive(Debug, Clone, Default)]
pub struct Frontier {
    /// Raw URLs waiting to be fetched
    queue: VecDeque<String>,

    /// Normalized forms of everything in `queue`
    queued: HashSet<String>,

    /// Normalized URLs already saved; only ever grows
    seen: BTreeSet<String>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh frontier holding only the start URL
    pub fn seeded(start_url: &str) -> Self {
        let mut frontier = Self::new();
        frontier.enqueue(start_url);
        frontier
    }

    /// Creates a frontier from a persisted state
    pub fn from_state(state: CrawlState) -> Self {
        let mut frontier = Self::new();
        frontier.restore(state);
        frontier
    }

    /// Loads the checkpoint, or seeds a fresh frontier if there is none
    ///
    /// A missing, unreadable or corrupt checkpoint is not an error: the crawl
    /// starts over from `start_url` and the reason is logged.
    pub fn restore_or_seed(store: &CheckpointStore, start_url: &str) -> Self {
        match store.load() {
            Ok(Some(state)) => {
                tracing::info!(
                    "Resuming from checkpoint of {}: {} seen, {} queued",
                    state.timestamp,
                    state.seen_urls.len(),
                    state.queue.len()
                );
                Self::from_state(state)
            }
            Ok(None) => {
                tracing::info!(
                    "No checkpoint at {}, starting from {}",
                    store.path().display(),
                    start_url
                );
                Self::seeded(start_url)
            }
            Err(e) => {
                tracing::warn!("Ignoring checkpoint ({}), starting from {}", e, start_url);
                Self::seeded(start_url)
            }
        }
    }

    /// Appends a URL unless it was already saved or is already waiting
    ///
    /// # Returns
    ///
    /// * `true` - The URL was queued
    /// * `false` - Its normalized form is seen or queued
    pub fn enqueue(&mut self, url: &str) -> bool {
        let normalized = normalize_url(url);
        if self.seen.contains(&normalized) || self.queued.contains(&normalized) {
            return false;
        }

        self.queued.insert(normalized);
        self.queue.push_back(url.to_string());
        true
    }

    /// Removes and returns up to `n` URLs in FIFO order
    pub fn dequeue_batch(&mut self, n: usize) -> Vec<String> {
        let count = n.min(self.queue.len());
        let batch: Vec<String> = self.queue.drain(..count).collect();
        for url in &batch {
            self.queued.remove(&normalize_url(url));
        }
        batch
    }

    /// Records a normalized URL as saved
    ///
    /// # Returns
    ///
    /// * `true` - It was not seen before
    /// * `false` - It was already seen
    pub fn mark_seen(&mut self, normalized: &str) -> bool {
        self.seen.insert(normalized.to_string())
    }

    pub fn is_seen(&self, normalized: &str) -> bool {
        self.seen.contains(normalized)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if no URL is waiting
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Iterates over the waiting URLs in dequeue order
    pub fn queued_urls(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    /// Iterates over the seen set
    pub fn seen_urls(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    /// Copies the frontier into a state stamped with the current time
    pub fn snapshot(&self) -> CrawlState {
        CrawlState {
            seen_urls: self.seen.clone(),
            queue: self.queue.iter().cloned().collect(),
            timestamp: Utc::now(),
        }
    }

    /// Replaces the whole frontier with a persisted state
    pub fn restore(&mut self, state: CrawlState) {
        self.queued = state.queue.iter().map(|url| normalize_url(url)).collect();
        self.queue = state.queue.into();
        self.seen = state.seen_urls;
    }
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.queue == other.queue && self.seen == other.seen
    }
}

impl Eq for Frontier {}
