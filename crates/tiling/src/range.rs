use serde::{Deserialize, Serialize};

use crate::coord::{RowOrder, TileCoord};

/// Inclusive rectangle of tile indices covering a bounds at one zoom level.
///
/// Invariant: `min.x <= max.x && min.y <= max.y`. Construction always
/// re-normalizes by componentwise min/max of the two diagonal corners:
/// forward/inverse projection near the poles or the antimeridian can invert
/// the naive corner ordering, so corner ordering is never trusted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRange {
    pub min: TileCoord,
    pub max: TileCoord,
}

impl TileRange {
    /// Normalizes an arbitrary corner pair into a valid range.
    pub fn normalized(a: TileCoord, b: TileCoord) -> Self {
        debug_assert_eq!(a.z, b.z);
        Self {
            min: TileCoord::new(a.z, a.x.min(b.x), a.y.min(b.y)),
            max: TileCoord::new(a.z, a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// The range covering a geographic box at `z`.
    ///
    /// Returns `None` for non-finite input (degenerate bounds upstream); the
    /// caller falls back to a secondary bounds source or enumerates nothing.
    pub fn covering(
        lon_min: f64,
        lat_min: f64,
        lon_max: f64,
        lat_max: f64,
        z: u8,
        order: RowOrder,
    ) -> Option<Self> {
        if !(lon_min.is_finite() && lat_min.is_finite() && lon_max.is_finite() && lat_max.is_finite())
        {
            return None;
        }
        let a = TileCoord::from_lonlat(lon_min, lat_max, z, order);
        let b = TileCoord::from_lonlat(lon_max, lat_min, z, order);
        Some(Self::normalized(a, b))
    }

    pub fn zoom(&self) -> u8 {
        self.min.z
    }

    pub fn count(&self) -> u64 {
        let w = (self.max.x - self.min.x) as u64 + 1;
        let h = (self.max.y - self.min.y) as u64 + 1;
        w * h
    }

    pub fn contains(&self, c: TileCoord) -> bool {
        c.z == self.min.z
            && (self.min.x..=self.max.x).contains(&c.x)
            && (self.min.y..=self.max.y).contains(&c.y)
    }

    /// Row-major iteration over every contained coordinate.
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        let z = self.min.z;
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| TileCoord::new(z, x, y)))
    }
}
