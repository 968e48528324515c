//! `ghsl info` – raster summary.

use anyhow::{Context, Result};
use ghsl_core::raster;
use std::path::Path;

pub async fn run_info(path: &Path) -> Result<()> {
    let owned = path.to_path_buf();
    let info = tokio::task::spawn_blocking(move || raster::describe(&owned))
        .await
        .context("info task join")??;
    let b = info.bounds();
    println!("file:       {}", path.display());
    println!("size:       {} x {} ({} band(s))", info.width, info.height, info.band_count);
    println!(
        "crs:        {}",
        info.epsg.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!("pixel:      {} x {}", info.geo_transform[1], -info.geo_transform[5]);
    println!("bounds:     {},{},{},{}", b.min_x, b.min_y, b.max_x, b.max_y);
    println!(
        "nodata:     {}",
        info.nodata.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}
