//! Tile grid geometry and bounding boxes.

use std::str::FromStr;

use super::TileId;
use crate::error::RequestError;
use crate::product::Crs;

pub const GRID_ROWS: u8 = 18;
pub const GRID_COLS: u8 = 36;

/// Axis-aligned box in the coordinates of one CRS (meters for Mollweide, degrees for WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, RequestError> {
        let coords = [min_x, min_y, max_x, max_y];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(RequestError::InvalidBBox("coordinates must be finite".into()));
        }
        if min_x >= max_x || min_y >= max_y {
            return Err(RequestError::InvalidBBox(format!(
                "min must be below max ({},{},{},{})",
                min_x, min_y, max_x, max_y
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Strict overlap: boxes sharing only an edge do not intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl FromStr for BBox {
    type Err = RequestError;

    /// `minx,miny,maxx,maxy`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(RequestError::InvalidBBox(format!(
                "expected minx,miny,maxx,maxy, got {:?}",
                s
            )));
        }
        let mut v = [0f64; 4];
        for (slot, part) in v.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| RequestError::InvalidBBox(format!("not a number: {:?}", part)))?;
        }
        BBox::new(v[0], v[1], v[2], v[3])
    }
}

/// Regular grid the published tiles are cut from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub origin_x: f64,
    pub origin_y: f64,
    pub tile_size: f64,
}

impl TileGrid {
    pub fn for_crs(crs: Crs) -> Self {
        match crs {
            Crs::Mollweide => TileGrid {
                origin_x: -18_041_000.0,
                origin_y: 9_000_000.0,
                tile_size: 1_000_000.0,
            },
            Crs::Wgs84 => TileGrid {
                origin_x: -180.0,
                origin_y: 90.0,
                tile_size: 10.0,
            },
        }
    }

    pub fn tile_bounds(&self, tile: TileId) -> BBox {
        let min_x = self.origin_x + f64::from(tile.col() - 1) * self.tile_size;
        let max_y = self.origin_y - f64::from(tile.row() - 1) * self.tile_size;
        BBox {
            min_x,
            min_y: max_y - self.tile_size,
            max_x: min_x + self.tile_size,
            max_y,
        }
    }

    /// All grid tiles whose footprint intersects `bbox`, row-major.
    pub fn tiles_intersecting(&self, bbox: &BBox) -> Vec<TileId> {
        let mut out = Vec::new();
        for row in 1..=GRID_ROWS {
            for col in 1..=GRID_COLS {
                let Ok(tile) = TileId::new(row, col) else {
                    continue;
                };
                if self.tile_bounds(tile).intersects(bbox) {
                    out.push(tile);
                }
            }
        }
        out
    }
}
