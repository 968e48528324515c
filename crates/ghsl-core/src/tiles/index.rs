//! Vector index of the tiles actually published.
//!
//! The grid has 648 cells but most are ocean and never published. The index
//! is a GeoJSON FeatureCollection (one polygon per tile) with `tile_id` and
//! `region` properties, e.g. produced from `GHSL_tiles.gpkg` with
//! `ogr2ogr -f GeoJSON`. Geometries are only used for their envelopes.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use super::{BBox, TileId};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
    geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    tile_id: Option<String>,
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    coordinates: serde_json::Value,
}

/// One published tile with its region and footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTile {
    pub id: TileId,
    pub region: String,
    pub bounds: BBox,
}

/// Published tiles, kept sorted by id.
#[derive(Debug, Clone, Default)]
pub struct TileIndex {
    tiles: BTreeMap<TileId, IndexedTile>,
}

impl TileIndex {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read tile index {}", path.display()))?;
        Self::from_geojson(&data).with_context(|| format!("parse tile index {}", path.display()))
    }

    pub fn from_geojson(data: &str) -> Result<Self> {
        let fc: FeatureCollection = serde_json::from_str(data)?;
        let mut tiles = BTreeMap::new();
        for (n, feature) in fc.features.into_iter().enumerate() {
            let Some(raw_id) = feature.properties.tile_id else {
                anyhow::bail!("feature {} has no tile_id property", n);
            };
            let id: TileId = raw_id.parse()?;
            let geometry = feature
                .geometry
                .with_context(|| format!("tile {} has no geometry", id))?;
            let bounds = envelope(&geometry.coordinates)
                .with_context(|| format!("tile {} has no usable coordinates", id))?;
            let region = feature.properties.region.unwrap_or_default();
            if tiles
                .insert(id, IndexedTile { id, region, bounds })
                .is_some()
            {
                tracing::warn!(tile = %id, "duplicate tile in index; keeping the last one");
            }
        }
        Ok(Self { tiles })
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, id: &TileId) -> bool {
        self.tiles.contains_key(id)
    }

    pub fn get(&self, id: &TileId) -> Option<&IndexedTile> {
        self.tiles.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedTile> {
        self.tiles.values()
    }

    pub fn tile_ids(&self) -> Vec<TileId> {
        self.tiles.keys().copied().collect()
    }

    /// Tiles whose footprint intersects `bbox` (footprints are in the index CRS).
    pub fn intersecting(&self, bbox: &BBox) -> Vec<TileId> {
        self.tiles
            .values()
            .filter(|t| t.bounds.intersects(bbox))
            .map(|t| t.id)
            .collect()
    }

    /// Region name → tiles, both sorted. Tiles without a region are grouped under `""`.
    pub fn regions(&self) -> BTreeMap<String, Vec<TileId>> {
        let mut out: BTreeMap<String, Vec<TileId>> = BTreeMap::new();
        for t in self.tiles.values() {
            out.entry(t.region.clone()).or_default().push(t.id);
        }
        out
    }
}

/// Bounding box of an arbitrarily nested GeoJSON coordinate array.
fn envelope(coords: &serde_json::Value) -> Option<BBox> {
    match coords {
        serde_json::Value::Array(items) => {
            if let [x, y, ..] = items.as_slice() {
                if let (Some(x), Some(y)) = (x.as_f64(), y.as_f64()) {
                    return Some(BBox {
                        min_x: x,
                        min_y: y,
                        max_x: x,
                        max_y: y,
                    });
                }
            }
            items
                .iter()
                .filter_map(envelope)
                .reduce(|a, b| a.union(&b))
        }
        _ => None,
    }
}
