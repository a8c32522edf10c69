//! Grid index: quantizes continuous lat/lng into integer cells
//!
//! The grid is anchored at (0, 0): cell (i, j) covers
//! `[i * tile, (i + 1) * tile) x [j * tile, (j + 1) * tile)` in degrees.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within ±90° latitude, ±180° longitude
    pub fn is_on_globe(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Shift by the given deltas (degrees)
    pub fn offset(self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(self.lat + d_lat, self.lng + d_lng)
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self::new(lat, lng)
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(p: LatLng) -> Self {
        [p.lat, p.lng]
    }
}

/// Failure to parse a textual cell or coin id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdError {
    #[error("malformed cell id {0:?}")]
    Cell(String),
    #[error("malformed coin id {0:?}")]
    Coin(String),
}

/// Integer cell address. Ordering is row-major: latitude index, then longitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CellId {
    pub i: i32,
    pub j: i32,
}

impl CellId {
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Map and registry key, `"{i}:{j}"`
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Luck seed for this cell, `"{i},{j}"`.
    ///
    /// Matches the comma join of the `[i, j]` tuple; changing it reshuffles
    /// every cache in the world.
    pub fn seed_key(&self) -> String {
        format!("{},{}", self.i, self.j)
    }

    /// Lower-left (south-west) corner
    pub fn anchor(&self, tile: f64) -> LatLng {
        LatLng::new(self.i as f64 * tile, self.j as f64 * tile)
    }

    /// Geographic extent of the cell
    pub fn bounds(&self, tile: f64) -> CellBounds {
        CellBounds {
            south_west: self.anchor(tile),
            north_east: LatLng::new(
                self.i.saturating_add(1) as f64 * tile,
                self.j.saturating_add(1) as f64 * tile,
            ),
        }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.i, self.j)
    }
}

impl FromStr for CellId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError::Cell(s.to_string());
        let (i, j) = s.split_once(':').ok_or_else(err)?;
        Ok(Self::new(
            i.parse().map_err(|_| err())?,
            j.parse().map_err(|_| err())?,
        ))
    }
}

impl From<CellId> for String {
    fn from(cell: CellId) -> Self {
        cell.key()
    }
}

impl TryFrom<String> for CellId {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Axis-aligned rectangle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl CellBounds {
    /// Inclusive containment test
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
    }
}

/// Cell containing a position
#[inline]
pub fn cell_of(position: LatLng, tile: f64) -> CellId {
    CellId::new(
        (position.lat / tile).floor() as i32,
        (position.lng / tile).floor() as i32,
    )
}
