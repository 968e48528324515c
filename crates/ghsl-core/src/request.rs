//! What the user asked for, validated against the repository's published combinations.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::RequestError;
use crate::product::{is_valid_epoch, Crs, Product, ProductSpec, Resolution, LAND_EPOCH};
use crate::tiles::{BBox, TileId, TileIndex};

/// Spatial extent of a download.
#[derive(Debug, Clone, PartialEq)]
pub enum Extent {
    /// The single global file of each product.
    Global,
    /// Every published tile, mosaicked into one file per region.
    Regions,
    /// Tiles intersecting a box, cropped to it. Coordinates are in the request CRS.
    BBox(BBox),
    /// An explicit tile list.
    Tiles(Vec<TileId>),
}

impl Extent {
    pub fn kind(&self) -> ExtentKind {
        match self {
            Extent::Global => ExtentKind::Global,
            Extent::Regions => ExtentKind::Regions,
            Extent::BBox(_) => ExtentKind::BBox,
            Extent::Tiles(_) => ExtentKind::Tiles,
        }
    }
}

/// Extent without its payload; what `--extent` parses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtentKind {
    Global,
    Regions,
    BBox,
    Tiles,
}

impl fmt::Display for ExtentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtentKind::Global => "global",
            ExtentKind::Regions => "regions",
            ExtentKind::BBox => "bbox",
            ExtentKind::Tiles => "tiles",
        })
    }
}

impl FromStr for ExtentKind {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(ExtentKind::Global),
            "regions" => Ok(ExtentKind::Regions),
            "bbox" => Ok(ExtentKind::BBox),
            "tiles" => Ok(ExtentKind::Tiles),
            _ => Err(RequestError::InvalidExtent(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub output_dir: PathBuf,
    pub products: Vec<Product>,
    pub epochs: Vec<u16>,
    pub crs: Crs,
    pub resolution: Resolution,
    pub extent: Extent,
    /// Prepended to every output file name.
    pub prefix: String,
    /// Mosaic tiles into one GeoTIFF per output; otherwise keep the staged tiles.
    pub merge: bool,
}

impl DownloadRequest {
    /// All four products, epoch 2020, Mollweide, 1 km, global extent.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            products: Product::ALL.to_vec(),
            epochs: vec![2020],
            crs: Crs::Mollweide,
            resolution: Resolution::M1000,
            extent: Extent::Global,
            prefix: String::new(),
            merge: true,
        }
    }

    /// Check every rule that does not need the network.
    ///
    /// Tiles of a `Tiles` extent are checked against `index` when one is
    /// available; otherwise any id on the grid is accepted.
    pub fn validate(&self, index: Option<&TileIndex>) -> Result<(), RequestError> {
        if self.products.is_empty() || self.epochs.is_empty() {
            return Err(RequestError::EmptySelection);
        }
        if let Some(bad) = self.epochs.iter().find(|e| !is_valid_epoch(**e)) {
            return Err(RequestError::InvalidEpoch(*bad));
        }
        if self.products.contains(&Product::Smod) && self.resolution == Resolution::M100 {
            return Err(RequestError::SmodResolution);
        }
        if self.products.contains(&Product::Land) && self.crs == Crs::Wgs84 {
            return Err(RequestError::LandCrs);
        }
        match &self.extent {
            Extent::Global => {}
            Extent::Regions => {
                if index.map_or(true, TileIndex::is_empty) {
                    return Err(RequestError::RegionsRequireIndex);
                }
            }
            Extent::BBox(_) => {}
            Extent::Tiles(tiles) => {
                if tiles.is_empty() {
                    return Err(RequestError::InvalidTile(String::new()));
                }
                if let Some(index) = index {
                    if let Some(bad) = tiles.iter().find(|t| !index.contains(t)) {
                        return Err(RequestError::InvalidTile(bad.to_string()));
                    }
                }
            }
        }
        for spec in self.product_specs() {
            spec.validate()?;
        }
        Ok(())
    }

    /// Expand into concrete layers. LAND becomes a single 2018 Mollweide layer
    /// listed first; other products are crossed with every epoch in request order.
    pub fn product_specs(&self) -> Vec<ProductSpec> {
        let mut out: Vec<ProductSpec> = Vec::new();
        if self.products.contains(&Product::Land) {
            out.push(ProductSpec::resolve(
                Product::Land,
                LAND_EPOCH,
                self.crs,
                self.resolution,
            ));
        }
        for product in self.products.iter().filter(|p| **p != Product::Land) {
            for epoch in &self.epochs {
                let spec = ProductSpec::resolve(*product, *epoch, self.crs, self.resolution);
                if !out.contains(&spec) {
                    out.push(spec);
                }
            }
        }
        out
    }
}
