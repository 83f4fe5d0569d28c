use foundation::math::MERCATOR_MAX_LAT_DEG;
use serde::{Deserialize, Serialize};

/// Row-indexing convention for a tile pyramid.
///
/// `XyzTopLeft` counts rows from the north edge (slippy/XYZ); `TmsBottomLeft`
/// counts from the south edge, i.e. `y' = 2^z - 1 - y`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowOrder {
    XyzTopLeft,
    TmsBottomLeft,
}

/// Tile coordinate in a power-of-two pyramid (ZXY scheme).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// Geographic edges of one tile, degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileEdges {
    pub lon_left: f64,
    pub lon_right: f64,
    pub lat_top: f64,
    pub lat_bottom: f64,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Tiles along one axis at this zoom level (2^z).
    pub fn tiles_per_axis(z: u8) -> u32 {
        1u32 << z
    }

    /// Converts a geographic coordinate to the tile containing it.
    ///
    /// Standard power-of-two Mercator tiling; x and y are clamped into
    /// `[0, 2^z - 1]` so out-of-range input (including the clamped polar
    /// latitudes) still yields a valid coordinate.
    pub fn from_lonlat(lon_deg: f64, lat_deg: f64, z: u8, order: RowOrder) -> Self {
        let n = Self::tiles_per_axis(z);
        let nf = n as f64;
        let max = (n - 1) as f64;

        let x = (((lon_deg + 180.0) / 360.0) * nf).floor().clamp(0.0, max) as u32;

        // Beyond the projection limit the row formula is undefined; clamping
        // first pins polar input to the outermost rows.
        let lat_rad = lat_deg
            .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
            .to_radians();
        let y_raw = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI)
            / 2.0
            * nf;
        let y = y_raw.floor().clamp(0.0, max) as u32;

        let coord = Self::new(z, x, y);
        match order {
            RowOrder::XyzTopLeft => coord,
            RowOrder::TmsBottomLeft => coord.flipped_row(),
        }
    }

    /// Same tile addressed under the opposite row convention.
    pub fn flipped_row(self) -> Self {
        let n = Self::tiles_per_axis(self.z);
        Self::new(self.z, self.x, n - 1 - self.y)
    }

    /// Geographic edges of this tile: the exact algebraic inverse of
    /// `from_lonlat`, used to size and place each tile quad.
    pub fn lonlat_edges(&self, order: RowOrder) -> TileEdges {
        let row_top = match order {
            RowOrder::XyzTopLeft => self.y,
            RowOrder::TmsBottomLeft => self.flipped_row().y,
        };
        TileEdges {
            lon_left: tile_x_to_lon(self.x, self.z),
            lon_right: tile_x_to_lon(self.x + 1, self.z),
            lat_top: tile_row_to_lat(row_top, self.z),
            lat_bottom: tile_row_to_lat(row_top + 1, self.z),
        }
    }
}

fn tile_x_to_lon(x: u32, z: u8) -> f64 {
    (x as f64 / TileCoord::tiles_per_axis(z) as f64) * 360.0 - 180.0
}

fn tile_row_to_lat(row: u32, z: u8) -> f64 {
    let n = std::f64::consts::PI
        - 2.0 * std::f64::consts::PI * row as f64 / TileCoord::tiles_per_axis(z) as f64;
    n.sinh().atan().to_degrees()
}
