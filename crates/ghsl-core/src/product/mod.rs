//! GHSL product identifiers.
//!
//! A product is addressed by theme, epoch, projection and resolution. The
//! 2023A release publishes BUILT_S, POP and SMOD for every 5-year epoch from
//! 1975 to 2030; LAND only exists as the 2018 Mollweide layer of release 2022A.

mod url;

pub use url::{archive_name, build_tile_url, normalize_base_url};

use crate::error::RequestError;
use std::fmt;
use std::str::FromStr;

/// Epochs published by the 2023A release.
pub const VALID_EPOCHS: [u16; 12] = [
    1975, 1980, 1985, 1990, 1995, 2000, 2005, 2010, 2015, 2020, 2025, 2030,
];

/// LAND has a single epoch regardless of what was requested.
pub const LAND_EPOCH: u16 = 2018;

pub fn is_valid_epoch(epoch: u16) -> bool {
    VALID_EPOCHS.contains(&epoch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Product {
    BuiltS,
    Pop,
    Land,
    Smod,
}

impl Product {
    pub const ALL: [Product; 4] = [Product::Pop, Product::BuiltS, Product::Land, Product::Smod];

    pub fn as_str(self) -> &'static str {
        match self {
            Product::BuiltS => "BUILT_S",
            Product::Pop => "POP",
            Product::Land => "LAND",
            Product::Smod => "SMOD",
        }
    }

    /// Data release folder: LAND was last published with 2022A.
    pub fn release(self) -> &'static str {
        match self {
            Product::Land => "R2022A",
            _ => "R2023A",
        }
    }

    /// Dataset version folder.
    pub fn version(self) -> &'static str {
        match self {
            Product::Smod => "V2-0",
            _ => "V1-0",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Product {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUILT_S" | "BUILT-S" => Ok(Product::BuiltS),
            "POP" => Ok(Product::Pop),
            "LAND" => Ok(Product::Land),
            "SMOD" => Ok(Product::Smod),
            _ => Err(RequestError::InvalidProduct(s.to_string())),
        }
    }
}

/// Projections GHSL products are distributed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Crs {
    /// World Mollweide, ESRI:54009.
    Mollweide,
    /// WGS84 geographic, EPSG:4326.
    Wgs84,
}

impl Crs {
    pub fn code(self) -> u32 {
        match self {
            Crs::Mollweide => 54009,
            Crs::Wgs84 => 4326,
        }
    }

    pub fn from_code(code: u32) -> Result<Self, RequestError> {
        match code {
            54009 => Ok(Crs::Mollweide),
            4326 => Ok(Crs::Wgs84),
            other => Err(RequestError::InvalidCrs(other.to_string())),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Crs {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("ESRI:"))
            .unwrap_or(trimmed);
        let code: u32 = digits
            .parse()
            .map_err(|_| RequestError::InvalidCrs(s.to_string()))?;
        Crs::from_code(code)
    }
}

/// Nominal grid resolution in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resolution {
    M100,
    M1000,
}

impl Resolution {
    pub fn meters(self) -> u32 {
        match self {
            Resolution::M100 => 100,
            Resolution::M1000 => 1000,
        }
    }

    pub fn from_meters(m: u32) -> Result<Self, RequestError> {
        match m {
            100 => Ok(Resolution::M100),
            1000 => Ok(Resolution::M1000),
            other => Err(RequestError::InvalidResolution(other.to_string())),
        }
    }

    /// Token used in folder and file names. WGS84 grids are named in arc seconds.
    pub fn token(self, crs: Crs) -> &'static str {
        match (crs, self) {
            (Crs::Mollweide, Resolution::M100) => "100",
            (Crs::Mollweide, Resolution::M1000) => "1000",
            (Crs::Wgs84, Resolution::M100) => "3ss",
            (Crs::Wgs84, Resolution::M1000) => "30ss",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.meters())
    }
}

impl FromStr for Resolution {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let m: u32 = s
            .trim()
            .trim_end_matches('m')
            .parse()
            .map_err(|_| RequestError::InvalidResolution(s.to_string()))?;
        Resolution::from_meters(m)
    }
}

/// One downloadable layer: theme, epoch, projection and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductSpec {
    pub product: Product,
    pub epoch: u16,
    pub crs: Crs,
    pub resolution: Resolution,
}

impl ProductSpec {
    /// The layer published for a selection. LAND only exists as the 2018
    /// Mollweide layer, so its epoch and projection are replaced.
    pub fn resolve(product: Product, epoch: u16, crs: Crs, resolution: Resolution) -> Self {
        match product {
            Product::Land => ProductSpec {
                product,
                epoch: LAND_EPOCH,
                crs: Crs::Mollweide,
                resolution,
            },
            _ => ProductSpec {
                product,
                epoch,
                crs,
                resolution,
            },
        }
    }

    /// Check the combination against what the repository actually publishes.
    pub fn validate(&self) -> Result<(), RequestError> {
        match self.product {
            Product::Land => {
                if self.crs != Crs::Mollweide {
                    return Err(RequestError::LandCrs);
                }
                if self.epoch != LAND_EPOCH {
                    return Err(RequestError::InvalidEpoch(self.epoch));
                }
            }
            Product::Smod if self.resolution == Resolution::M100 => {
                return Err(RequestError::SmodResolution);
            }
            _ => {
                if !is_valid_epoch(self.epoch) {
                    return Err(RequestError::InvalidEpoch(self.epoch));
                }
            }
        }
        Ok(())
    }

    /// `{PRODUCT}_{epoch}_{crs}_{resolution}`, e.g. `POP_2020_54009_1000`.
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.product,
            self.epoch,
            self.crs.code(),
            self.resolution.meters()
        )
    }

    /// Dataset stem used by the repository, e.g. `GHS_POP_E2020_GLOBE_R2023A_54009_1000`.
    pub fn dataset_name(&self) -> String {
        format!(
            "GHS_{}_E{}_GLOBE_{}_{}_{}",
            self.product,
            self.epoch,
            self.product.release(),
            self.crs.code(),
            self.resolution.token(self.crs)
        )
    }
}

impl fmt::Display for ProductSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}
