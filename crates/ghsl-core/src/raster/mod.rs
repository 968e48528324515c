//! Raster side of the pipeline: mosaic staged tiles into one GeoTIFF and
//! read the result back.
//!
//! GDAL does the heavy lifting when the crate is built with the `gdal`
//! feature, for single tiles too. Without it only the trivial case (one
//! tile, no crop) can be handled, by moving the file into place.

#[cfg(feature = "gdal")]
mod gdal_io;
mod staged;

pub use staged::StagedDataset;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::tiles::BBox;

/// How staged tiles become one output file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOptions {
    /// GTiff creation options as `(KEY, VALUE)`.
    pub creation_options: Vec<(String, String)>,
    /// Target extent in the rasters' CRS.
    pub crop: Option<BBox>,
}

/// Summary of a single-file raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub width: usize,
    pub height: usize,
    pub band_count: usize,
    /// GDAL order: origin x, pixel width, row rotation, origin y, column rotation, pixel height.
    pub geo_transform: [f64; 6],
    pub epsg: Option<i32>,
    pub nodata: Option<f64>,
}

impl RasterInfo {
    /// `(min_x, min_y, max_x, max_y)` for north-up rasters.
    pub fn bounds(&self) -> BBox {
        let gt = &self.geo_transform;
        let x0 = gt[0];
        let y0 = gt[3];
        let x1 = x0 + gt[1] * self.width as f64;
        let y1 = y0 + gt[5] * self.height as f64;
        BBox {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }
}

/// Write the mosaic of `inputs` to `output`.
pub fn merge_tiles(inputs: &[PathBuf], output: &Path, opts: &MergeOptions) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("nothing to merge into {}", output.display());
    }
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    if moves_without_rewrite(inputs, opts) {
        return move_into_place(&inputs[0], output);
    }
    merge_many(inputs, output, opts)
}

/// Only builds without GDAL skip the rewrite; with GDAL every output gets
/// the configured creation options.
fn moves_without_rewrite(inputs: &[PathBuf], opts: &MergeOptions) -> bool {
    cfg!(not(feature = "gdal")) && inputs.len() == 1 && opts.crop.is_none()
}

#[cfg(feature = "gdal")]
fn merge_many(inputs: &[PathBuf], output: &Path, opts: &MergeOptions) -> Result<()> {
    gdal_io::merge(inputs, output, opts)
}

#[cfg(not(feature = "gdal"))]
fn merge_many(inputs: &[PathBuf], output: &Path, opts: &MergeOptions) -> Result<()> {
    anyhow::bail!(
        "mosaicking {} tile(s){} into {} needs a build with the `gdal` feature; \
         rerun with --no-merge to keep the individual tiles",
        inputs.len(),
        if opts.crop.is_some() { " with a crop" } else { "" },
        output.display()
    )
}

/// Rename, falling back to copy + remove across filesystems.
fn move_into_place(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)
        .with_context(|| format!("copy {} to {}", from.display(), to.display()))?;
    std::fs::remove_file(from).with_context(|| format!("remove {}", from.display()))?;
    Ok(())
}

/// Size, georeferencing and nodata of `path`.
#[cfg(feature = "gdal")]
pub fn describe(path: &Path) -> Result<RasterInfo> {
    gdal_io::describe(path)
}

#[cfg(not(feature = "gdal"))]
pub fn describe(path: &Path) -> Result<RasterInfo> {
    anyhow::bail!(
        "reading {} needs a build with the `gdal` feature",
        path.display()
    )
}

/// Pixels of band `band` (1-based) as `f64`, row-major.
#[cfg(feature = "gdal")]
pub fn read_band(path: &Path, band: usize) -> Result<ndarray::Array2<f64>> {
    gdal_io::read_band(path, band)
}
