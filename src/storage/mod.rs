//! Storage module for persisting crawl artifacts
//!
//! This module handles everything the crawler writes besides its checkpoint:
//! - Extracted text, wrapped with a source header
//! - Original binaries (PDFs, images, office documents) filed by category
//! - The extension to category table

mod categories;
mod filesystem;
mod traits;

pub use categories::FileCategory;
pub use filesystem::{format_text_artifact, FsArtifactSink};
pub use traits::{ArtifactSink, StorageError, StorageResult};
