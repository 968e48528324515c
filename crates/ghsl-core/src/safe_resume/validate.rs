//! Compares stored entry metadata with the current HEAD result.

use crate::cache_db::ArchiveEntry;
use crate::fetch_head::HeadResult;
use thiserror::Error;

/// Which validators disagree between the cache entry and the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangedFields {
    pub etag: bool,
    pub last_modified: bool,
    pub size: bool,
}

impl ChangedFields {
    pub fn any(&self) -> bool {
        self.etag || self.last_modified || self.size
    }

    fn describe(&self) -> String {
        [
            (self.etag, "ETag"),
            (self.last_modified, "Last-Modified"),
            (self.size, "size"),
        ]
        .iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("remote archive changed ({})", .0.describe())]
    RemoteChanged(ChangedFields),
}

/// Both sides must carry a value for it to count as a change.
fn differs<T: PartialEq>(stored: Option<T>, remote: Option<T>) -> bool {
    matches!((stored, remote), (Some(a), Some(b)) if a != b)
}

/// Ok(()) if nothing known about the remote file contradicts `entry`.
pub fn validate_against_remote(
    entry: &ArchiveEntry,
    head: &HeadResult,
) -> Result<(), ValidationError> {
    let changed = ChangedFields {
        etag: differs(entry.etag.as_deref(), head.etag.as_deref()),
        last_modified: differs(entry.last_modified.as_deref(), head.last_modified.as_deref()),
        size: differs(entry.total_size, head.content_length.map(|n| n as i64)),
    };
    if changed.any() {
        return Err(ValidationError::RemoteChanged(changed));
    }
    Ok(())
}
