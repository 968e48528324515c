//! Connection, schema and timestamps. Entry reads and writes live in `entries`.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS archives (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE,
        product_key TEXT NOT NULL,
        tile_id TEXT NOT NULL,
        archive_path TEXT NOT NULL,
        total_size INTEGER,
        etag TEXT,
        last_modified TEXT,
        sha256 TEXT,
        state TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS archives_product ON archives (product_key, tile_id)",
];

/// `~/.local/state/ghsl/cache.db`
pub fn default_db_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ghsl")?;
    Ok(xdg_dirs.get_state_home().join("cache.db"))
}

/// Handle to the archive cache. Cloning shares the pool.
#[derive(Clone)]
pub struct CacheDb {
    pub(crate) pool: Pool<Sqlite>,
}

impl CacheDb {
    pub async fn open_default() -> Result<Self> {
        Self::open_at(default_db_path()?).await
    }

    /// Open or create the database file, creating parent directories.
    pub async fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(opts)
            .await
            .with_context(|| format!("open cache db {}", path.display()))?;
        let db = CacheDb { pool };
        db.migrate().await?;
        tracing::debug!(path = %path.display(), "cache db ready");
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

pub(crate) fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Single-connection in-memory database for tests.
#[cfg(test)]
pub(crate) async fn open_memory() -> Result<CacheDb> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    let db = CacheDb { pool };
    db.migrate().await?;
    Ok(db)
}
