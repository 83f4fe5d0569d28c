/// Web-Mercator latitude limit (degrees). Latitudes beyond this project to
/// unbounded y, so forward projection clamps to it.
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.051_128_779_806_59;

/// Geographic coordinates in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LonLat {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl LonLat {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

/// Spherical Mercator projection centered on a reference coordinate.
///
/// Forward maps degrees to planar units with y growing northward and the
/// center at the origin; `unproject` is the exact algebraic inverse. Pure
/// and stateless.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mercator {
    pub center: LonLat,
    pub scale: f64,
}

impl Mercator {
    pub fn new(center: LonLat, scale: f64) -> Self {
        Self { center, scale }
    }

    pub fn project(&self, p: LonLat) -> [f64; 2] {
        let x = self.scale * (p.lon_deg - self.center.lon_deg).to_radians();
        let y = self.scale * (mercator_y(p.lat_deg) - mercator_y(self.center.lat_deg));
        [x, y]
    }

    pub fn unproject(&self, p: [f64; 2]) -> LonLat {
        let lon_deg = (p[0] / self.scale).to_degrees() + self.center.lon_deg;
        let psi = p[1] / self.scale + mercator_y(self.center.lat_deg);
        let lat_deg = (2.0 * psi.exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
        LonLat::new(lon_deg, lat_deg)
    }
}

impl Default for Mercator {
    /// Framing used by the boundary dataset this compositor ships with.
    fn default() -> Self {
        Self::new(LonLat::new(105.0, 34.0), 3500.0)
    }
}

fn mercator_y(lat_deg: f64) -> f64 {
    let phi = lat_deg
        .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
        .to_radians();
    (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln()
}
