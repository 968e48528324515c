//! Fetch one tile archive, going through the cache when one is configured.
//!
//! Order of operations: cache lookup (checksum and optional remote
//! revalidation), HEAD probe, resume or restart of the `.part` file,
//! download with retry, SHA-256, rename into place, record the entry.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cache_db::{ArchiveEntry, CacheDb, EntryState, PendingArchive};
use crate::checksum;
use crate::config::HttpConfig;
use crate::downloader::{download_to_path, CurlOptions};
use crate::fetch_head::{probe, HeadResult};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::safe_resume::validate_against_remote;
use crate::storage::{temp_path, StorageWriter};

/// Where an archive came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded { path: PathBuf, bytes: u64 },
    Cached { path: PathBuf },
    /// The server answered 404/410: no archive is published for this tile.
    NotPublished,
}

impl FetchOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            FetchOutcome::Downloaded { path, .. } | FetchOutcome::Cached { path } => Some(path),
            FetchOutcome::NotPublished => None,
        }
    }
}

/// Archive to fetch.
#[derive(Debug, Clone)]
pub struct ArchiveRequest {
    pub url: String,
    pub product_key: String,
    pub tile_id: String,
    /// Final location of the zip.
    pub archive_path: PathBuf,
}

/// Shared fetch settings; cheap to clone into tasks.
#[derive(Clone)]
pub struct ArchiveFetcher {
    db: Option<CacheDb>,
    http: HttpConfig,
    policy: RetryPolicy,
    verify_on_reuse: bool,
    revalidate_remote: bool,
}

impl ArchiveFetcher {
    /// Without `db` every call downloads afresh.
    pub fn new(db: Option<CacheDb>, http: HttpConfig, policy: RetryPolicy) -> Self {
        Self {
            db,
            http,
            policy,
            verify_on_reuse: true,
            revalidate_remote: false,
        }
    }

    pub fn with_reuse_checks(mut self, verify_on_reuse: bool, revalidate_remote: bool) -> Self {
        self.verify_on_reuse = verify_on_reuse;
        self.revalidate_remote = revalidate_remote;
        self
    }

    pub fn caching(&self) -> bool {
        self.db.is_some()
    }

    pub async fn fetch_archive(&self, req: &ArchiveRequest) -> Result<FetchOutcome> {
        let entry = match &self.db {
            Some(db) => db.find_by_url(&req.url).await?,
            None => None,
        };

        let mut head: Option<HeadResult> = None;
        if let Some(entry) = entry.as_ref().filter(|e| e.state == EntryState::Complete) {
            if self.revalidate_remote {
                head = self.head(&req.url).await?;
            }
            if self.reusable(entry, head.as_ref()).await? {
                tracing::debug!(url = %req.url, path = %entry.archive_path.display(), "archive served from cache");
                return Ok(FetchOutcome::Cached {
                    path: entry.archive_path.clone(),
                });
            }
            if let Some(db) = &self.db {
                db.invalidate(entry.id).await?;
            }
        }

        if head.is_none() {
            head = self.head(&req.url).await?;
        }
        let Some(head) = head else {
            return Ok(FetchOutcome::NotPublished);
        };
        if let Some(cd) = &head.content_disposition {
            tracing::debug!(url = %req.url, content_disposition = %cd, "head");
        }

        if let Some(parent) = req.archive_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let part = temp_path(&req.archive_path);
        let resumable = head.accept_ranges
            && part.is_file()
            && entry
                .as_ref()
                .filter(|e| e.state == EntryState::Downloading && e.archive_path == req.archive_path)
                .is_some_and(|e| match validate_against_remote(e, &head) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(url = %req.url, "discarding partial download: {}", err);
                        false
                    }
                });
        if !resumable && part.exists() {
            tokio::fs::remove_file(&part)
                .await
                .with_context(|| format!("remove stale {}", part.display()))?;
        }

        let entry_id = match &self.db {
            Some(db) => Some(
                db.begin_download(&PendingArchive {
                    url: req.url.clone(),
                    product_key: req.product_key.clone(),
                    tile_id: req.tile_id.clone(),
                    archive_path: req.archive_path.clone(),
                    total_size: head.content_length.map(|n| n as i64),
                    etag: head.etag.clone(),
                    last_modified: head.last_modified.clone(),
                })
                .await?,
            ),
            None => None,
        };

        let url = req.url.clone();
        let part_c = part.clone();
        let curl = CurlOptions::from(&self.http);
        let policy = self.policy;
        let expected = head.content_length;
        let accept_ranges = head.accept_ranges;
        let result = tokio::task::spawn_blocking(move || {
            download_to_path(&url, &part_c, expected, accept_ranges, curl, &policy)
        })
        .await
        .context("download task join")?;

        let bytes = match result {
            Ok(n) => n,
            Err(e) if e.is_not_found() => {
                tracing::warn!(url = %req.url, "archive not published ({})", e);
                if let (Some(db), Some(id)) = (&self.db, entry_id) {
                    db.remove_entry(id).await?;
                }
                let _ = tokio::fs::remove_file(&part).await;
                return Ok(FetchOutcome::NotPublished);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)).with_context(|| format!("download {}", req.url));
            }
        };

        let final_path = req.archive_path.clone();
        let sha = tokio::task::spawn_blocking(move || -> Result<String> {
            let sha = checksum::sha256_path(&part)?;
            StorageWriter::open_existing(&part)?.finalize(&final_path)?;
            Ok(sha)
        })
        .await
        .context("checksum task join")??;

        if let (Some(db), Some(id)) = (&self.db, entry_id) {
            db.complete_download(id, bytes as i64, &sha).await?;
        }
        tracing::info!(url = %req.url, bytes, sha256 = %sha, "archive downloaded");
        Ok(FetchOutcome::Downloaded {
            path: req.archive_path.clone(),
            bytes,
        })
    }

    /// HEAD with retry. `Ok(None)` when the archive is not published; other
    /// probe failures are logged and replaced by an empty result so the GET
    /// still runs.
    async fn head(&self, url: &str) -> Result<Option<HeadResult>> {
        let u = url.to_string();
        let http = self.http.clone();
        let policy = self.policy;
        let res = tokio::task::spawn_blocking(move || run_with_retry(&policy, |_| probe(&u, &http)))
            .await
            .context("head task join")?;
        match res {
            Ok(h) => Ok(Some(h)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => {
                tracing::warn!(url, "HEAD failed, downloading without validators: {}", e);
                Ok(Some(HeadResult::default()))
            }
        }
    }

    /// A complete entry may be served if its file is present, its checksum
    /// still matches (when verifying) and the remote is unchanged (when `head` is given).
    async fn reusable(&self, entry: &ArchiveEntry, head: Option<&HeadResult>) -> Result<bool> {
        let Some(expected) = entry.sha256.clone() else {
            return Ok(false);
        };
        if !entry.archive_path.is_file() {
            tracing::warn!(path = %entry.archive_path.display(), "cached archive missing");
            return Ok(false);
        }
        if let Some(head) = head {
            if let Err(e) = validate_against_remote(entry, head) {
                tracing::info!(url = %entry.url, "cache entry stale: {}", e);
                return Ok(false);
            }
        }
        if self.verify_on_reuse {
            let path = entry.archive_path.clone();
            let ok = tokio::task::spawn_blocking(move || checksum::matches(&path, &expected))
                .await
                .context("checksum task join")??;
            if !ok {
                tracing::warn!(path = %entry.archive_path.display(), "cached archive checksum mismatch");
                return Ok(false);
            }
        }
        Ok(true)
    }
}
