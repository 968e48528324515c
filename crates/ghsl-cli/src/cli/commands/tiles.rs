//! `ghsl tiles` – list tiles from the index or the bare grid.

use anyhow::{Context, Result};
use ghsl_core::config::GhslConfig;
use ghsl_core::product::Crs;
use ghsl_core::tiles::{BBox, TileGrid, TileIndex};
use std::path::PathBuf;

pub fn run_tiles(
    cfg: &GhslConfig,
    bbox: Option<BBox>,
    crs: Crs,
    region: Option<&str>,
    tile_index: Option<PathBuf>,
) -> Result<()> {
    let index_path = tile_index.or_else(|| cfg.tile_index.clone());
    let Some(index_path) = index_path else {
        if region.is_some() {
            anyhow::bail!("--region needs a tile index (--tile-index or tile_index in config.toml)");
        }
        let bbox = bbox.context("without a tile index, --bbox is required")?;
        let grid = TileGrid::for_crs(crs);
        let tiles = grid.tiles_intersecting(&bbox);
        println!("{:<8} {}", "TILE", "BOUNDS");
        for t in &tiles {
            let b = grid.tile_bounds(*t);
            println!("{:<8} {},{},{},{}", t.to_string(), b.min_x, b.min_y, b.max_x, b.max_y);
        }
        println!("{} grid tile(s); some may not be published", tiles.len());
        return Ok(());
    };

    let index = TileIndex::load(&index_path)?;
    let mut n = 0usize;
    println!("{:<8} {:<10} {}", "TILE", "REGION", "BOUNDS");
    for t in index.iter() {
        if region.is_some_and(|r| !t.region.eq_ignore_ascii_case(r)) {
            continue;
        }
        if bbox.as_ref().is_some_and(|b| !t.bounds.intersects(b)) {
            continue;
        }
        let b = &t.bounds;
        println!(
            "{:<8} {:<10} {},{},{},{}",
            t.id.to_string(), t.region, b.min_x, b.min_y, b.max_x, b.max_y
        );
        n += 1;
    }
    println!("{} tile(s)", n);
    Ok(())
}
