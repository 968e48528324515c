//! `ghsl url` – print the archive URL of one layer.

use anyhow::Result;
use ghsl_core::config::GhslConfig;
use ghsl_core::product::{build_tile_url, normalize_base_url, Crs, Product, ProductSpec, Resolution};
use ghsl_core::tiles::TileRef;

pub(crate) fn layer_url(
    cfg: &GhslConfig,
    product: Product,
    epoch: u16,
    crs: Crs,
    resolution: Resolution,
    tile: &TileRef,
) -> Result<String> {
    let spec = ProductSpec::resolve(product, epoch, crs, resolution);
    if spec.epoch != epoch || spec.crs != crs {
        eprintln!("note: {} is only published as {}", product, spec);
    }
    spec.validate()?;
    let base = normalize_base_url(&cfg.base_url)?;
    Ok(build_tile_url(&base, &spec, tile))
}

pub fn run_url(
    cfg: &GhslConfig,
    product: Product,
    epoch: u16,
    crs: Crs,
    resolution: Resolution,
    tile: TileRef,
) -> Result<()> {
    println!("{}", layer_url(cfg, product, epoch, crs, resolution, &tile)?);
    Ok(())
}
