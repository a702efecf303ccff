//! State module for tracking crawl progress
//!
//! This module provides the engine lifecycle and the persisted crawl state.
//!
//! # Components
//!
//! - `EngineState`: Lifecycle of the crawl engine (idle, running, draining, shutting down, stopped)
//! - `CrawlState`: Frontier and seen-set as written to disk
//! - `CheckpointStore`: Atomic JSON persistence of `CrawlState`

mod checkpoint;
mod engine_state;

// Re-export main types
pub use checkpoint::{
    parse_timestamp, CheckpointStore, CrawlState, StateError, StateResult, CHECKPOINT_FILE,
};
pub use engine_state::EngineState;
