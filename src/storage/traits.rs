//! Storage traits and error types
//!
//! This module defines the trait interface for artifact sinks and
//! associated error types.

use crate::crawler::ExtractedContent;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while saving an artifact
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact name: {0}")]
    InvalidName(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for the content extracted from a crawled URL
///
/// Implementations are shared between the engine and its tests, so they must be
/// usable through `&self` from any thread.
pub trait ArtifactSink: Send + Sync {
    /// Persists one extracted artifact
    ///
    /// # Arguments
    ///
    /// * `url` - The URL the content was fetched from; names the artifact
    /// * `content` - The extracted content
    ///
    /// # Returns
    ///
    /// * `Ok(paths)` - Every file written for this artifact
    /// * `Err(StorageError)` - A write failed; files written before it are kept
    fn save(&self, url: &str, content: &ExtractedContent) -> StorageResult<Vec<PathBuf>>;
}
