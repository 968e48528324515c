//! One product job: fetch and stage its tiles, then write its outputs.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::task::JoinSet;

use crate::fetch::{ArchiveFetcher, ArchiveRequest, FetchOutcome};
use crate::plan::{ProductJob, TileTask};
use crate::raster::{merge_tiles, MergeOptions, StagedDataset};
use crate::request::DownloadRequest;
use crate::stage::extract_tif;
use crate::tiles::TileRef;

use super::{tiles_dir, DownloadReport, OutputFile, PipelineContext, PipelineEvent};

/// Result of one tile task.
enum Staged {
    Ready { tif: PathBuf, from_cache: bool },
    Missing,
}

pub(super) async fn run_job(
    job: &ProductJob,
    request: &DownloadRequest,
    ctx: &PipelineContext,
    report: &mut DownloadReport,
) -> Result<()> {
    let key = job.spec.key();
    tokio::fs::create_dir_all(&job.work_dir)
        .await
        .with_context(|| format!("create {}", job.work_dir.display()))?;
    ctx.emit(PipelineEvent::JobStarted {
        key: key.clone(),
        tiles: job.tasks.len(),
    });

    let staged = fetch_all(job, ctx).await?;

    let mut tifs: BTreeMap<TileRef, PathBuf> = BTreeMap::new();
    for (tile, s) in staged {
        match s {
            Staged::Ready { tif, from_cache } => {
                if from_cache {
                    report.from_cache += 1;
                } else {
                    report.downloaded += 1;
                }
                ctx.emit(PipelineEvent::TileReady {
                    key: key.clone(),
                    tile,
                    from_cache,
                });
                tifs.insert(tile, tif);
            }
            Staged::Missing if job.tolerate_missing => {
                tracing::warn!(product = %key, %tile, "tile not published, skipping");
                report.skipped += 1;
                ctx.emit(PipelineEvent::TileSkipped {
                    key: key.clone(),
                    tile,
                });
            }
            Staged::Missing => {
                anyhow::bail!("no archive published for {} {}", key, tile);
            }
        }
    }
    if tifs.is_empty() {
        anyhow::bail!("none of the {} selected tile(s) is published", job.tasks.len());
    }

    if request.merge {
        write_merged(job, ctx, &tifs, report).await?;
    } else {
        keep_tiles(job, request, ctx, &tifs, report).await?;
    }

    tokio::fs::remove_dir_all(&job.work_dir)
        .await
        .with_context(|| format!("remove {}", job.work_dir.display()))?;
    Ok(())
}

/// Fetch and stage every task with at most `max_parallel_downloads` in flight.
/// The first failure aborts the remaining tasks.
async fn fetch_all(job: &ProductJob, ctx: &PipelineContext) -> Result<Vec<(TileRef, Staged)>> {
    let max_parallel = ctx.config.max_parallel_downloads.max(1);
    let key = job.spec.key();
    let mut pending = job.tasks.iter();
    let mut join_set = JoinSet::new();
    let mut out = Vec::with_capacity(job.tasks.len());

    loop {
        while join_set.len() < max_parallel {
            let Some(task) = pending.next() else {
                break;
            };
            let archive_path = match &ctx.archive_dir {
                Some(dir) => dir.join(&task.archive_name),
                None => job.work_dir.join(&task.archive_name),
            };
            let req = ArchiveRequest {
                url: task.url.clone(),
                product_key: key.clone(),
                tile_id: task.tile.to_string(),
                archive_path,
            };
            let fetcher = ctx.fetcher.clone();
            let work_dir = job.work_dir.clone();
            let task = task.clone();
            join_set.spawn(async move {
                let staged = fetch_and_stage(&fetcher, &req, work_dir).await;
                (task, staged)
            });
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        let (task, staged): (TileTask, Result<Staged>) =
            res.map_err(|e| anyhow::anyhow!("tile task join: {}", e))?;
        let staged = staged.with_context(|| format!("tile {}", task.tile))?;
        out.push((task.tile, staged));
    }
    Ok(out)
}

async fn fetch_and_stage(
    fetcher: &ArchiveFetcher,
    req: &ArchiveRequest,
    work_dir: PathBuf,
) -> Result<Staged> {
    let outcome = fetcher.fetch_archive(req).await?;
    let from_cache = matches!(outcome, FetchOutcome::Cached { .. });
    let Some(archive) = outcome.path().map(|p| p.to_path_buf()) else {
        return Ok(Staged::Missing);
    };
    let keep_archive = fetcher.caching();
    let tif = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let tif = extract_tif(&archive, &work_dir)?;
        if !keep_archive {
            std::fs::remove_file(&archive)
                .with_context(|| format!("remove {}", archive.display()))?;
        }
        Ok(tif)
    })
    .await
    .context("stage task join")??;
    Ok(Staged::Ready { tif, from_cache })
}

async fn write_merged(
    job: &ProductJob,
    ctx: &PipelineContext,
    tifs: &BTreeMap<TileRef, PathBuf>,
    report: &mut DownloadReport,
) -> Result<()> {
    let opts = MergeOptions {
        creation_options: ctx.config.creation_option_pairs(),
        crop: job.crop,
    };
    for group in &job.outputs {
        let inputs: Vec<PathBuf> = group
            .tiles
            .iter()
            .filter_map(|t| tifs.get(t).cloned())
            .collect();
        if inputs.is_empty() {
            tracing::warn!(output = %group.path.display(), "no tiles available, output not written");
            continue;
        }
        let output = group.path.clone();
        let opts = opts.clone();
        let dataset = tokio::task::spawn_blocking(move || -> Result<StagedDataset> {
            merge_tiles(&inputs, &output, &opts)?;
            StagedDataset::bind(&output)
        })
        .await
        .context("merge task join")??;
        ctx.emit(PipelineEvent::OutputWritten {
            path: dataset.path().to_path_buf(),
        });
        report.outputs.push(OutputFile {
            key: job.spec.key(),
            region: group.region.clone(),
            tile: None,
            dataset,
        });
    }
    Ok(())
}

async fn keep_tiles(
    job: &ProductJob,
    request: &DownloadRequest,
    ctx: &PipelineContext,
    tifs: &BTreeMap<TileRef, PathBuf>,
    report: &mut DownloadReport,
) -> Result<()> {
    let key = job.spec.key();
    let dir = tiles_dir(&request.output_dir, &request.prefix, &key);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("create {}", dir.display()))?;
    for (tile, tif) in tifs {
        let name = tif
            .file_name()
            .map(PathBuf::from)
            .with_context(|| format!("staged tile without file name: {}", tif.display()))?;
        let dest = dir.join(name);
        tokio::fs::rename(tif, &dest)
            .await
            .with_context(|| format!("move {} to {}", tif.display(), dest.display()))?;
        let dataset = tokio::task::spawn_blocking(move || StagedDataset::bind(dest))
            .await
            .context("checksum task join")??;
        ctx.emit(PipelineEvent::OutputWritten {
            path: dataset.path().to_path_buf(),
        });
        report.outputs.push(OutputFile {
            key: key.clone(),
            region: None,
            tile: Some(*tile),
            dataset,
        });
    }
    Ok(())
}
