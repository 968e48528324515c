//! GDAL-backed mosaic and reads.

use anyhow::{Context, Result};
use gdal::cpl::CslStringList;
use gdal::programs::raster::{build_vrt, BuildVRTOptions};
use gdal::{Dataset, DriverManager};
use std::path::{Path, PathBuf};

use super::{MergeOptions, RasterInfo};

/// VRT over all inputs (clipped to the crop window), copied to GTiff.
pub(super) fn merge(inputs: &[PathBuf], output: &Path, opts: &MergeOptions) -> Result<()> {
    let datasets = inputs
        .iter()
        .map(|p| Dataset::open(p).with_context(|| format!("open {}", p.display())))
        .collect::<Result<Vec<_>>>()?;

    let vrt_opts = match opts.crop {
        Some(b) => Some(BuildVRTOptions::new([
            "-te".to_string(),
            b.min_x.to_string(),
            b.min_y.to_string(),
            b.max_x.to_string(),
            b.max_y.to_string(),
        ])?),
        None => None,
    };
    let vrt = build_vrt(None::<&Path>, &datasets, vrt_opts).context("build VRT")?;

    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut creation = CslStringList::new();
    for (k, v) in &opts.creation_options {
        creation.set_name_value(k, v)?;
    }
    vrt.create_copy(&driver, output, &creation)
        .with_context(|| format!("write {}", output.display()))?;
    tracing::info!(output = %output.display(), tiles = inputs.len(), "mosaic written");
    Ok(())
}

pub(super) fn describe(path: &Path) -> Result<RasterInfo> {
    let ds = Dataset::open(path).with_context(|| format!("open {}", path.display()))?;
    let (width, height) = ds.raster_size();
    let geo_transform = ds.geo_transform()?;
    let epsg = ds.spatial_ref().ok().and_then(|srs| srs.auth_code().ok());
    let nodata = ds.rasterband(1).ok().and_then(|b| b.no_data_value());
    Ok(RasterInfo {
        width,
        height,
        band_count: ds.raster_count() as usize,
        geo_transform,
        epsg,
        nodata,
    })
}

pub(super) fn read_band(path: &Path, band: usize) -> Result<ndarray::Array2<f64>> {
    let ds = Dataset::open(path).with_context(|| format!("open {}", path.display()))?;
    let (w, h) = ds.raster_size();
    let rb = ds
        .rasterband(band)
        .with_context(|| format!("band {} of {}", band, path.display()))?;
    let arr = rb.read_as_array::<f64>((0, 0), (w, h), (w, h), None)?;
    Ok(arr)
}
