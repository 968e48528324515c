//! Entry read operations: list and lookup.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::PathBuf;

use super::super::db::CacheDb;
use super::super::types::{ArchiveEntry, EntryId, EntryState};

const COLUMNS: &str = "id, url, product_key, tile_id, archive_path, total_size, \
                       etag, last_modified, sha256, state, created_at, updated_at";

fn entry_from_row(row: &SqliteRow) -> ArchiveEntry {
    let archive_path: String = row.get("archive_path");
    let state: String = row.get("state");
    ArchiveEntry {
        id: row.get("id"),
        url: row.get("url"),
        product_key: row.get("product_key"),
        tile_id: row.get("tile_id"),
        archive_path: PathBuf::from(archive_path),
        total_size: row.get("total_size"),
        etag: row.get("etag"),
        last_modified: row.get("last_modified"),
        sha256: row.get("sha256"),
        state: EntryState::from_str(&state),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl CacheDb {
    /// All entries, oldest first.
    pub async fn list_entries(&self) -> Result<Vec<ArchiveEntry>> {
        let rows = sqlx::query(&format!("SELECT {} FROM archives ORDER BY id ASC", COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(entry_from_row).collect())
    }

    pub async fn get_entry(&self, id: EntryId) -> Result<Option<ArchiveEntry>> {
        let row = sqlx::query(&format!("SELECT {} FROM archives WHERE id = ?1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(entry_from_row))
    }

    /// Entries are unique per URL; this is the cache lookup.
    pub async fn find_by_url(&self, url: &str) -> Result<Option<ArchiveEntry>> {
        let row = sqlx::query(&format!("SELECT {} FROM archives WHERE url = ?1", COLUMNS))
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(entry_from_row))
    }
}
