//! End-to-end download: validate, plan, fetch and stage tiles, mosaic.
//!
//! Product jobs run one after another; the tiles of a job are fetched
//! concurrently (bounded by `max_parallel_downloads`).

mod job;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::cache_db::CacheDb;
use crate::config::GhslConfig;
use crate::fetch::ArchiveFetcher;
use crate::plan::DownloadPlan;
use crate::product::normalize_base_url;
use crate::raster::StagedDataset;
use crate::request::DownloadRequest;
use crate::tiles::{TileIndex, TileRef};

/// Progress notifications, sent best-effort (dropped when the channel is full).
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    JobStarted { key: String, tiles: usize },
    TileReady { key: String, tile: TileRef, from_cache: bool },
    TileSkipped { key: String, tile: TileRef },
    OutputWritten { path: PathBuf },
}

/// One file handed back to the caller.
#[derive(Debug, Clone)]
pub struct OutputFile {
    /// Product key, e.g. `POP_2020_54009_1000`.
    pub key: String,
    pub region: Option<String>,
    /// Set for unmerged tiles.
    pub tile: Option<TileRef>,
    pub dataset: StagedDataset,
}

#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub outputs: Vec<OutputFile>,
    /// Archives fetched over the network.
    pub downloaded: usize,
    pub from_cache: usize,
    /// Grid tiles the server does not publish.
    pub skipped: usize,
}

/// Everything a run needs besides the request.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: GhslConfig,
    pub base_url: String,
    pub index: Option<TileIndex>,
    pub fetcher: ArchiveFetcher,
    /// Where archives are kept when caching; `None` stages them in the work dir.
    pub archive_dir: Option<PathBuf>,
    events: Option<mpsc::Sender<PipelineEvent>>,
}

impl PipelineContext {
    /// Build from config. `db = None` disables the archive cache for this run.
    pub fn new(config: GhslConfig, db: Option<CacheDb>, index: Option<TileIndex>) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;
        let cache = config.cache();
        let db = db.filter(|_| cache.enabled);
        let archive_dir = match db {
            Some(_) => Some(config.archive_dir()?),
            None => None,
        };
        let fetcher = ArchiveFetcher::new(db, config.http(), config.retry_policy())
            .with_reuse_checks(cache.verify_on_reuse, cache.revalidate_remote);
        Ok(Self {
            config,
            base_url,
            index,
            fetcher,
            archive_dir,
            events: None,
        })
    }

    pub fn with_events(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub(crate) fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.try_send(event);
        }
    }
}

/// Directory holding unmerged tiles: `{dir}/{prefix}{key}_tiles`.
pub fn tiles_dir(dir: &Path, prefix: &str, key: &str) -> PathBuf {
    dir.join(format!("{}{}_tiles", prefix, key))
}

/// Run a full download. Outputs follow the order of the request's product specs.
pub async fn download_ghsl(request: &DownloadRequest, ctx: &PipelineContext) -> Result<DownloadReport> {
    let plan = DownloadPlan::build(request, ctx.index.as_ref(), &ctx.base_url)?;
    tokio::fs::create_dir_all(&plan.output_dir)
        .await
        .with_context(|| format!("create {}", plan.output_dir.display()))?;
    tracing::info!(
        output_dir = %plan.output_dir.display(),
        jobs = plan.jobs.len(),
        archives = plan.task_count(),
        "starting download"
    );

    let mut report = DownloadReport::default();
    for job in &plan.jobs {
        job::run_job(job, request, ctx, &mut report)
            .await
            .with_context(|| format!("product {}", job.spec))?;
    }
    tracing::info!(
        outputs = report.outputs.len(),
        downloaded = report.downloaded,
        from_cache = report.from_cache,
        skipped = report.skipped,
        "download finished"
    );
    Ok(report)
}
