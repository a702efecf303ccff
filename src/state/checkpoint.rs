use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the checkpoint inside a crawl root
pub const CHECKPOINT_FILE: &str = "crawler_state.json";

/// Checkpoint read/write errors
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Checkpoint I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed checkpoint at {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StateResult<T> = std::result::Result<T, StateError>;

/// Persisted frontier and seen-set
///
/// Every URL in `queue` is still to be visited; every entry in `seen_urls` is the
/// normalized form of a URL whose content has been saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlState {
    #[serde(default)]
    pub seen_urls: BTreeSet<String>,

    #[serde(default)]
    pub queue: Vec<String>,

    /// Written as RFC 3339; read leniently so a bad stamp never costs the lists
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl CrawlState {
    /// Creates an empty state stamped with the current time
    pub fn new() -> Self {
        Self {
            seen_urls: BTreeSet::new(),
            queue: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses an RFC 3339 time, or an ISO-8601 time without offset taken as local time
///
/// # Example
///
/// ```
/// use tidemark::state::parse_timestamp;
///
/// assert!(parse_timestamp("2024-05-01T12:00:00Z").is_some());
/// assert!(parse_timestamp("2024-05-01T12:00:00.123456").is_some());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.with_timezone(&Utc));
    }

    let naive = raw.parse::<NaiveDateTime>().ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .or_else(|| Some(Utc.from_utc_datetime(&naive)))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let parsed = raw.as_ref().and_then(|v| v.as_str()).and_then(parse_timestamp);

    Ok(parsed.unwrap_or_else(|| {
        tracing::warn!("Unreadable checkpoint timestamp {:?}, using current time", raw);
        Utc::now()
    }))
}

/// Reads and writes the JSON checkpoint of one crawl root
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Creates a store for `<crawl_root>/crawler_state.json`
    pub fn new(crawl_root: &Path) -> Self {
        Self {
            path: crawl_root.join(CHECKPOINT_FILE),
        }
    }

    /// Creates a store for an explicit file path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes the state atomically
    ///
    /// The state is serialized to a sibling `.tmp` file which is then renamed over
    /// the checkpoint, so a crash mid-write leaves the previous checkpoint intact.
    ///
    /// # Arguments
    ///
    /// * `state` - The state to persist
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The checkpoint now holds `state`
    /// * `Err(StateError)` - Failed to create, write or rename the file
    pub fn save(&self, state: &CrawlState) -> StateResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let temp_path = self.path.with_extension("json.tmp");

        let file = File::create(&temp_path).map_err(|source| StateError::Io {
            path: temp_path.clone(),
            source,
        })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, state).map_err(|source| {
            StateError::Serialization {
                path: temp_path.clone(),
                source,
            }
        })?;
        writer.flush().map_err(|source| StateError::Io {
            path: temp_path.clone(),
            source,
        })?;
        drop(writer);

        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))?;

        tracing::debug!(
            path = %self.path.display(),
            seen = state.seen_urls.len(),
            queued = state.queue.len(),
            "Checkpoint saved"
        );
        Ok(())
    }

    /// Reads the checkpoint
    ///
    /// # Returns
    ///
    /// * `Ok(Some(state))` - The checkpoint exists and parsed
    /// * `Ok(None)` - No checkpoint has been written yet
    /// * `Err(StateError)` - The file exists but could not be read or parsed
    pub fn load(&self) -> StateResult<Option<CrawlState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let reader = BufReader::new(file);
        let state = serde_json::from_reader(reader).map_err(|source| {
            StateError::Serialization {
                path: self.path.clone(),
                source,
            }
        })?;

        tracing::debug!(path = %self.path.display(), "Checkpoint loaded");
        Ok(Some(state))
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
