//! GHSL tiling schema.
//!
//! Tiles are addressed as `R{row}_C{col}` on an 18 x 36 grid. The same ids
//! are used for the Mollweide (1000 km tiles) and WGS84 (10 degree tiles)
//! distributions; see [`TileGrid`].

mod grid;
mod index;

pub use grid::{BBox, TileGrid, GRID_COLS, GRID_ROWS};
pub use index::{IndexedTile, TileIndex};

use crate::error::RequestError;
use std::fmt;
use std::str::FromStr;

/// Position of a tile on the GHSL grid (1-based, rows grow southward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    row: u8,
    col: u8,
}

impl TileId {
    pub fn new(row: u8, col: u8) -> Result<Self, RequestError> {
        if !(1..=GRID_ROWS).contains(&row) || !(1..=GRID_COLS).contains(&col) {
            return Err(RequestError::InvalidTile(format!("R{}_C{}", row, col)));
        }
        Ok(Self { row, col })
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn col(&self) -> u8 {
        self.col
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}_C{}", self.row, self.col)
    }
}

impl FromStr for TileId {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RequestError::InvalidTile(s.to_string());
        let upper = s.trim().to_ascii_uppercase();
        let (r, c) = upper.split_once('_').ok_or_else(invalid)?;
        let row: u8 = r
            .strip_prefix('R')
            .and_then(|n| n.parse().ok())
            .ok_or_else(invalid)?;
        let col: u8 = c
            .strip_prefix('C')
            .and_then(|n| n.parse().ok())
            .ok_or_else(invalid)?;
        TileId::new(row, col).map_err(|_| invalid())
    }
}

/// Either the single global file or one tile of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TileRef {
    Global,
    Tile(TileId),
}

impl fmt::Display for TileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileRef::Global => f.write_str("global"),
            TileRef::Tile(id) => id.fmt(f),
        }
    }
}

impl FromStr for TileRef {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("global") {
            return Ok(TileRef::Global);
        }
        s.parse().map(TileRef::Tile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_id_parse_and_display() {
        let t: TileId = "R3_C19".parse().unwrap();
        assert_eq!(t.row(), 3);
        assert_eq!(t.col(), 19);
        assert_eq!(t.to_string(), "R3_C19");
        assert_eq!("r18_c36".parse::<TileId>().unwrap().to_string(), "R18_C36");
    }

    #[test]
    fn tile_id_rejects_out_of_grid() {
        assert!("R0_C1".parse::<TileId>().is_err());
        assert!("R19_C1".parse::<TileId>().is_err());
        assert!("R1_C37".parse::<TileId>().is_err());
        assert!("R1C1".parse::<TileId>().is_err());
        assert!("X1_C1".parse::<TileId>().is_err());
        assert_eq!(
            "R1_C99".parse::<TileId>(),
            Err(RequestError::InvalidTile("R1_C99".to_string()))
        );
    }

    #[test]
    fn tile_ref_global() {
        assert_eq!("global".parse::<TileRef>().unwrap(), TileRef::Global);
        assert_eq!(TileRef::Global.to_string(), "global");
        assert_eq!(
            "R2_C2".parse::<TileRef>().unwrap(),
            TileRef::Tile(TileId::new(2, 2).unwrap())
        );
    }
}
