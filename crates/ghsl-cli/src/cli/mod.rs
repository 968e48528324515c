//! CLI for the GHSL downloader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ghsl_core::config;
use ghsl_core::product::{Crs, Product, Resolution};
use ghsl_core::request::ExtentKind;
use ghsl_core::tiles::{BBox, TileId, TileRef};
use std::path::PathBuf;

use commands::{run_cache, run_checksum, run_download, run_info, run_tiles, run_url};

/// Top-level CLI for the GHSL downloader.
#[derive(Debug, Parser)]
#[command(name = "ghsl")]
#[command(about = "Download and mosaic GHSL population, built-up, land and settlement layers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download products and write one GeoTIFF per product (or per region).
    Download(DownloadArgs),

    /// Print the archive URL of one product layer.
    Url {
        #[arg(long)]
        product: Product,
        /// Epoch; LAND is always the 2018 layer.
        #[arg(long)]
        epoch: u16,
        #[arg(long, default_value = "54009")]
        crs: Crs,
        #[arg(long, default_value = "1000")]
        resolution: Resolution,
        /// Tile id (R{row}_C{col}) or `global`.
        #[arg(long, default_value = "global")]
        tile: TileRef,
    },

    /// List tiles from the tile index, or grid tiles covering a bbox.
    Tiles {
        /// minx,miny,maxx,maxy in the CRS given by --crs.
        #[arg(long, allow_hyphen_values = true)]
        bbox: Option<BBox>,
        #[arg(long, default_value = "54009")]
        crs: Crs,
        /// Only tiles of this region (needs a tile index).
        #[arg(long)]
        region: Option<String>,
        #[arg(long, value_name = "FILE")]
        tile_index: Option<PathBuf>,
    },

    /// Inspect or prune the archive cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        path: PathBuf,
    },

    /// Print size, georeferencing and nodata of a raster.
    Info {
        path: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Output directory.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Comma-separated products: BUILT_S, POP, LAND, SMOD.
    #[arg(short, long, value_delimiter = ',', default_values_t = Product::ALL)]
    pub products: Vec<Product>,

    /// Comma-separated epochs (1975..=2030, step 5). LAND always uses 2018.
    #[arg(short, long, value_delimiter = ',', default_values_t = [2020u16])]
    pub epochs: Vec<u16>,

    /// 54009 (Mollweide) or 4326 (WGS84).
    #[arg(long, default_value = "54009")]
    pub crs: Crs,

    /// 100 or 1000 (meters).
    #[arg(long, default_value = "1000")]
    pub resolution: Resolution,

    /// global, regions, bbox or tiles.
    #[arg(long, default_value = "global")]
    pub extent: ExtentKind,

    /// minx,miny,maxx,maxy in the request CRS (with --extent bbox).
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<BBox>,

    /// Comma-separated tile ids (with --extent tiles).
    #[arg(long, value_delimiter = ',')]
    pub tiles: Vec<TileId>,

    /// Prefix for output file names.
    #[arg(long, default_value = "")]
    pub prefix: String,

    /// Keep individual tiles instead of mosaicking them.
    #[arg(long)]
    pub no_merge: bool,

    /// Do not use or fill the archive cache.
    #[arg(long)]
    pub no_cache: bool,

    /// GeoJSON tile index (overrides `tile_index` in config.toml).
    #[arg(long, value_name = "FILE")]
    pub tile_index: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// List cached archives.
    List,
    /// Recompute checksums and mark mismatches invalid.
    Verify,
    /// Remove one entry.
    Remove {
        id: i64,
        /// Also delete the archive (and any partial download).
        #[arg(long)]
        delete_files: bool,
    },
    /// Remove every entry.
    Clear {
        #[arg(long)]
        delete_files: bool,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Download(args) => run_download(&cfg, args).await?,
            CliCommand::Url {
                product,
                epoch,
                crs,
                resolution,
                tile,
            } => run_url(&cfg, product, epoch, crs, resolution, tile)?,
            CliCommand::Tiles {
                bbox,
                crs,
                region,
                tile_index,
            } => run_tiles(&cfg, bbox, crs, region.as_deref(), tile_index)?,
            CliCommand::Cache { action } => run_cache(action).await?,
            CliCommand::Checksum { path } => run_checksum(&path).await?,
            CliCommand::Info { path } => run_info(&path).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
