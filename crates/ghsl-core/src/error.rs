//! Request validation errors.
//!
//! Kept as a typed enum so the CLI can report them without a backtrace and
//! tests can match on the exact rule that was violated.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("{0} not a valid product (expected BUILT_S, POP, LAND or SMOD)")]
    InvalidProduct(String),
    #[error("{0} not a valid epoch (1975..=2030, every 5 years)")]
    InvalidEpoch(u16),
    #[error("{0} not a valid crs (expected 54009 or 4326)")]
    InvalidCrs(String),
    #[error("{0} not a valid resolution (expected 100 or 1000)")]
    InvalidResolution(String),
    #[error("{0} not a valid tile")]
    InvalidTile(String),
    #[error("unsupported extent {0:?} (expected global, regions, bbox or tiles)")]
    InvalidExtent(String),
    #[error("invalid bounding box: {0}")]
    InvalidBBox(String),
    #[error("SMOD is only available at 1000 resolution")]
    SmodResolution,
    #[error("LAND is only available in crs 54009")]
    LandCrs,
    #[error("at least one product and one epoch must be requested")]
    EmptySelection,
    #[error("the regions extent needs a tile index (set tile_index in config.toml or pass --tile-index)")]
    RegionsRequireIndex,
    #[error("bounding box does not intersect any tile")]
    EmptyBBox,
}
