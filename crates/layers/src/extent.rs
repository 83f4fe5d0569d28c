use foundation::PlanarBounds;
use foundation::math::Mercator;
use formats::GeoFeature;

/// Planar bounds of one feature: min/max over every projected ring vertex,
/// holes included.
pub fn feature_bounds(feature: &GeoFeature, projection: &Mercator) -> PlanarBounds {
    let mut bounds = PlanarBounds::empty();
    for polygon in &feature.polygons {
        for ring in &polygon.rings {
            for p in ring {
                bounds.include(projection.project(*p));
            }
        }
    }
    bounds
}

/// Union of all feature bounds. Empty input stays degenerate; downstream
/// range construction treats that as "no coverage".
pub fn aggregate_bounds(features: &[GeoFeature], projection: &Mercator) -> PlanarBounds {
    features
        .iter()
        .fold(PlanarBounds::empty(), |acc, feature| {
            acc.union(feature_bounds(feature, projection))
        })
}

/// Planar center of a feature: the source's precomputed center when present,
/// else the mean of all projected vertices. `[0, 0]` for empty geometry.
pub fn feature_center(feature: &GeoFeature, projection: &Mercator) -> [f64; 2] {
    if let Some(center) = feature.center {
        return projection.project(center);
    }

    let mut sum = [0.0, 0.0];
    let mut count = 0usize;
    for polygon in &feature.polygons {
        for ring in &polygon.rings {
            for p in ring {
                let q = projection.project(*p);
                sum[0] += q[0];
                sum[1] += q[1];
                count += 1;
            }
        }
    }
    if count == 0 {
        return [0.0, 0.0];
    }
    [sum[0] / count as f64, sum[1] / count as f64]
}
