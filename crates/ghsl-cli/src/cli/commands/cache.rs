//! `ghsl cache` – list, verify and prune cached archives.

use anyhow::{Context, Result};
use ghsl_core::cache_db::{ArchiveEntry, CacheDb, EntryState};
use ghsl_core::checksum;
use ghsl_core::storage::temp_path;

use crate::cli::CacheAction;

pub async fn run_cache(action: CacheAction) -> Result<()> {
    let db = CacheDb::open_default().await?;
    match action {
        CacheAction::List => list(&db).await,
        CacheAction::Verify => verify(&db).await,
        CacheAction::Remove { id, delete_files } => remove(&db, id, delete_files).await,
        CacheAction::Clear { delete_files } => clear(&db, delete_files).await,
    }
}

async fn list(db: &CacheDb) -> Result<()> {
    let entries = db.list_entries().await?;
    if entries.is_empty() {
        println!("Cache is empty.");
        return Ok(());
    }
    println!(
        "{:<6} {:<12} {:<12} {:<26} {:<8} {}",
        "ID", "STATE", "SIZE", "PRODUCT", "TILE", "ARCHIVE"
    );
    for e in entries {
        let size = e
            .total_size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<12} {:<12} {:<26} {:<8} {}",
            e.id,
            e.state.as_str(),
            size,
            e.product_key,
            e.tile_id,
            e.archive_path.display()
        );
    }
    Ok(())
}

async fn verify(db: &CacheDb) -> Result<()> {
    let entries = db.list_entries().await?;
    let (mut ok, mut bad) = (0usize, 0usize);
    for e in entries.into_iter().filter(|e| e.state == EntryState::Complete) {
        let path = e.archive_path.clone();
        let expected = e.sha256.clone().unwrap_or_default();
        let matches = tokio::task::spawn_blocking(move || checksum::matches(&path, &expected))
            .await
            .context("checksum task join")??;
        if matches {
            ok += 1;
        } else {
            bad += 1;
            db.invalidate(e.id).await?;
            println!("invalid: {} ({})", e.archive_path.display(), e.id);
        }
    }
    println!("{} archive(s) ok, {} invalidated", ok, bad);
    Ok(())
}

async fn delete_files_of(entry: &ArchiveEntry) -> Result<()> {
    for path in [entry.archive_path.clone(), temp_path(&entry.archive_path)] {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!(path = %path.display(), "deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("delete {}", path.display())),
        }
    }
    Ok(())
}

async fn remove(db: &CacheDb, id: i64, delete_files: bool) -> Result<()> {
    let entry = db
        .get_entry(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("cache entry {} not found", id))?;
    if delete_files {
        delete_files_of(&entry).await?;
    }
    db.remove_entry(id).await?;
    println!("Removed cache entry {}.", id);
    Ok(())
}

async fn clear(db: &CacheDb, delete_files: bool) -> Result<()> {
    if delete_files {
        for e in db.list_entries().await? {
            delete_files_of(&e).await?;
        }
    }
    let n = db.clear().await?;
    println!("Removed {} cache entr{}.", n, if n == 1 { "y" } else { "ies" });
    Ok(())
}
