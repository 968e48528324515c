//! Entry write operations: begin, complete, state, remove.

use anyhow::Result;
use sqlx::Row;

use super::super::db::{unix_timestamp, CacheDb};
use super::super::types::{EntryId, EntryState, PendingArchive};

impl CacheDb {
    /// Record that a download of `pending.url` is starting.
    ///
    /// Inserts a `downloading` row or resets the existing row for the URL
    /// (clearing its checksum). Returns the row id.
    pub async fn begin_download(&self, pending: &PendingArchive) -> Result<EntryId> {
        let now = unix_timestamp();
        let archive_path = pending.archive_path.to_string_lossy().into_owned();
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO archives (
                url, product_key, tile_id, archive_path, total_size,
                etag, last_modified, sha256, state, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?9, ?9)
            ON CONFLICT(url) DO UPDATE SET
                product_key = excluded.product_key,
                tile_id = excluded.tile_id,
                archive_path = excluded.archive_path,
                total_size = excluded.total_size,
                etag = excluded.etag,
                last_modified = excluded.last_modified,
                sha256 = NULL,
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&pending.url)
        .bind(&pending.product_key)
        .bind(&pending.tile_id)
        .bind(&archive_path)
        .bind(pending.total_size)
        .bind(&pending.etag)
        .bind(&pending.last_modified)
        .bind(EntryState::Downloading.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let row = sqlx::query("SELECT id FROM archives WHERE url = ?1")
            .bind(&pending.url)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(row.get("id"))
    }

    /// Mark a download complete with its final size and SHA-256.
    pub async fn complete_download(&self, id: EntryId, total_size: i64, sha256: &str) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE archives
            SET total_size = ?1,
                sha256 = ?2,
                state = ?3,
                updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(total_size)
        .bind(sha256)
        .bind(EntryState::Complete.as_str())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_state(&self, id: EntryId, state: EntryState) -> Result<()> {
        let now = unix_timestamp();
        sqlx::query(
            r#"
            UPDATE archives
            SET state = ?1,
                updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(state.as_str())
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Shorthand for `set_state(id, Invalid)`.
    pub async fn invalidate(&self, id: EntryId) -> Result<()> {
        self.set_state(id, EntryState::Invalid).await
    }

    /// Delete a row. Returns false if it did not exist. Files are left alone.
    pub async fn remove_entry(&self, id: EntryId) -> Result<bool> {
        let r = sqlx::query("DELETE FROM archives WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected() > 0)
    }

    /// Delete every row. Returns the number removed.
    pub async fn clear(&self) -> Result<u64> {
        let r = sqlx::query("DELETE FROM archives")
            .execute(&self.pool)
            .await?;
        Ok(r.rows_affected())
    }
}
