//! Turn a validated request into concrete tile URLs and output files.

use std::path::{Path, PathBuf};

use crate::error::RequestError;
use crate::product::{archive_name, build_tile_url, Crs, ProductSpec};
use crate::request::{DownloadRequest, Extent};
use crate::tiles::{BBox, TileGrid, TileId, TileIndex, TileRef};

/// One archive to fetch and stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TileTask {
    pub tile: TileRef,
    pub url: String,
    /// Archive file name, unique per product and tile.
    pub archive_name: String,
}

/// One file produced by mosaicking a subset of a job's tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputGroup {
    /// Region name for the `regions` extent.
    pub region: Option<String>,
    pub tiles: Vec<TileRef>,
    pub path: PathBuf,
}

/// Everything needed to produce the outputs of one product layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductJob {
    pub spec: ProductSpec,
    /// Scratch directory under the output dir, removed once outputs are written.
    pub work_dir: PathBuf,
    pub tasks: Vec<TileTask>,
    pub outputs: Vec<OutputGroup>,
    /// Crop window for the `bbox` extent.
    pub crop: Option<BBox>,
    /// Tiles came from the bare grid; some may not exist remotely.
    pub tolerate_missing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPlan {
    pub output_dir: PathBuf,
    pub jobs: Vec<ProductJob>,
}

impl DownloadPlan {
    /// Build the plan. `base_url` must already be normalised (trailing `/`).
    pub fn build(
        request: &DownloadRequest,
        index: Option<&TileIndex>,
        base_url: &str,
    ) -> Result<Self, RequestError> {
        request.validate(index)?;

        let (tiles, tolerate_missing) = select_tiles(request, index)?;
        let groups = group_tiles(request, index, &tiles);

        let jobs = request
            .product_specs()
            .into_iter()
            .map(|spec| {
                let key = spec.key();
                let tasks = tiles
                    .iter()
                    .map(|tile| TileTask {
                        tile: *tile,
                        url: build_tile_url(base_url, &spec, tile),
                        archive_name: archive_name(&spec, tile),
                    })
                    .collect();
                let outputs = groups
                    .iter()
                    .map(|(region, tiles)| OutputGroup {
                        region: region.clone(),
                        tiles: tiles.clone(),
                        path: output_path(&request.output_dir, &request.prefix, &key, region.as_deref()),
                    })
                    .collect();
                ProductJob {
                    spec,
                    work_dir: request.output_dir.join(&key),
                    tasks,
                    outputs,
                    crop: match request.extent {
                        Extent::BBox(b) => Some(b),
                        _ => None,
                    },
                    tolerate_missing,
                }
            })
            .collect();

        Ok(DownloadPlan {
            output_dir: request.output_dir.clone(),
            jobs,
        })
    }

    pub fn task_count(&self) -> usize {
        self.jobs.iter().map(|j| j.tasks.len()).sum()
    }
}

/// `{dir}/{region_}{prefix}{key}.tif`
pub fn output_path(dir: &Path, prefix: &str, key: &str, region: Option<&str>) -> PathBuf {
    let name = match region {
        Some(r) => format!("{}_{}{}.tif", r, prefix, key),
        None => format!("{}{}.tif", prefix, key),
    };
    dir.join(name)
}

fn select_tiles(
    request: &DownloadRequest,
    index: Option<&TileIndex>,
) -> Result<(Vec<TileRef>, bool), RequestError> {
    let to_refs = |ids: Vec<TileId>| ids.into_iter().map(TileRef::Tile).collect::<Vec<_>>();
    match &request.extent {
        Extent::Global => Ok((vec![TileRef::Global], false)),
        Extent::Regions => {
            let index = index.ok_or(RequestError::RegionsRequireIndex)?;
            Ok((to_refs(index.tile_ids()), false))
        }
        Extent::Tiles(ids) => {
            let mut ids = ids.clone();
            ids.sort();
            ids.dedup();
            Ok((to_refs(ids), false))
        }
        Extent::BBox(bbox) => {
            let grid = TileGrid::for_crs(request.crs);
            let (ids, tolerate) = match index {
                // Index footprints are Mollweide; tile ids are shared by both grids.
                Some(index) if request.crs == Crs::Mollweide => (index.intersecting(bbox), false),
                Some(index) => (
                    grid.tiles_intersecting(bbox)
                        .into_iter()
                        .filter(|id| index.contains(id))
                        .collect(),
                    false,
                ),
                None => (grid.tiles_intersecting(bbox), true),
            };
            if ids.is_empty() {
                return Err(RequestError::EmptyBBox);
            }
            Ok((to_refs(ids), tolerate))
        }
    }
}

fn group_tiles(
    request: &DownloadRequest,
    index: Option<&TileIndex>,
    tiles: &[TileRef],
) -> Vec<(Option<String>, Vec<TileRef>)> {
    match (&request.extent, index) {
        (Extent::Regions, Some(index)) => index
            .regions()
            .into_iter()
            .map(|(region, ids)| (Some(region), ids.into_iter().map(TileRef::Tile).collect()))
            .collect(),
        _ => vec![(None, tiles.to_vec())],
    }
}
