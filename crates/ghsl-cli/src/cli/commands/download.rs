//! `ghsl download` – run the pipeline and report what was written.

use anyhow::{Context, Result};
use ghsl_core::cache_db::CacheDb;
use ghsl_core::config::GhslConfig;
use ghsl_core::pipeline::{download_ghsl, PipelineContext, PipelineEvent};
use ghsl_core::request::{DownloadRequest, Extent, ExtentKind};
use ghsl_core::tiles::TileIndex;

use crate::cli::DownloadArgs;

/// Turn parsed arguments into a request; extent payloads must match `--extent`.
pub(crate) fn build_request(args: &DownloadArgs) -> Result<DownloadRequest> {
    let extent = match args.extent {
        ExtentKind::Global => Extent::Global,
        ExtentKind::Regions => Extent::Regions,
        ExtentKind::BBox => Extent::BBox(args.bbox.context("--extent bbox needs --bbox")?),
        ExtentKind::Tiles => {
            if args.tiles.is_empty() {
                anyhow::bail!("--extent tiles needs --tiles");
            }
            Extent::Tiles(args.tiles.clone())
        }
    };
    if args.bbox.is_some() && args.extent != ExtentKind::BBox {
        tracing::warn!("--bbox ignored with --extent {}", args.extent);
    }
    let mut request = DownloadRequest::new(&args.output_dir);
    request.products = args.products.clone();
    request.epochs = args.epochs.clone();
    request.crs = args.crs;
    request.resolution = args.resolution;
    request.extent = extent;
    request.prefix = args.prefix.clone();
    request.merge = !args.no_merge;
    Ok(request)
}

pub async fn run_download(cfg: &GhslConfig, args: DownloadArgs) -> Result<()> {
    let request = build_request(&args)?;

    let index = match args.tile_index.as_ref().or(cfg.tile_index.as_ref()) {
        Some(path) => Some(TileIndex::load(path)?),
        None => None,
    };
    let db = if args.no_cache || !cfg.cache().enabled {
        None
    } else {
        Some(CacheDb::open_default().await?)
    };

    let (tx, mut rx) = tokio::sync::mpsc::channel::<PipelineEvent>(64);
    let ctx = PipelineContext::new(cfg.clone(), db, index)?.with_events(tx);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::JobStarted { key, tiles } => {
                    println!("{}: {} archive(s)", key, tiles);
                }
                PipelineEvent::TileReady {
                    key,
                    tile,
                    from_cache,
                } => {
                    let src = if from_cache { "cache" } else { "downloaded" };
                    println!("  {} {} ({})", key, tile, src);
                }
                PipelineEvent::TileSkipped { key, tile } => {
                    println!("  {} {} not published, skipped", key, tile);
                }
                PipelineEvent::OutputWritten { path } => {
                    println!("  wrote {}", path.display());
                }
            }
        }
    });

    let result = download_ghsl(&request, &ctx).await;
    drop(ctx);
    let _ = printer.await;
    let report = result?;

    println!(
        "{} file(s) written; {} archive(s) downloaded, {} from cache, {} skipped",
        report.outputs.len(),
        report.downloaded,
        report.from_cache,
        report.skipped
    );
    Ok(())
}
