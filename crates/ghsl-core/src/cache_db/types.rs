//! Types stored in the archive cache.

use std::fmt;
use std::path::PathBuf;

/// Row identifier.
pub type EntryId = i64;

/// Lifecycle of a cached archive, stored as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Transfer started; `archive_path.part` may hold a prefix of the file.
    Downloading,
    /// Archive is on disk and `sha256` was recorded.
    Complete,
    /// Checksum mismatch, missing file, or remote changed. Next fetch starts over.
    Invalid,
}

impl EntryState {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryState::Downloading => "downloading",
            EntryState::Complete => "complete",
            EntryState::Invalid => "invalid",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "downloading" => EntryState::Downloading,
            "complete" => EntryState::Complete,
            _ => EntryState::Invalid,
        }
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full cache row.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub id: EntryId,
    pub url: String,
    pub product_key: String,
    pub tile_id: String,
    pub archive_path: PathBuf,
    pub total_size: Option<i64>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub sha256: Option<String>,
    pub state: EntryState,
    pub created_at: i64,
    pub updated_at: i64,
}

/// What is known when a download starts.
#[derive(Debug, Clone, Default)]
pub struct PendingArchive {
    pub url: String,
    pub product_key: String,
    pub tile_id: String,
    pub archive_path: PathBuf,
    pub total_size: Option<i64>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}
