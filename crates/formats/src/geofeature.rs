use foundation::math::LonLat;
use geojson::{FeatureCollection, GeoJson, Value};

/// One polygon: ring 0 is the outer boundary, the remaining rings are holes.
///
/// Ring winding from the source is trusted as-is; no validation or
/// correction is performed.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPolygon {
    pub rings: Vec<Vec<LonLat>>,
}

/// A boundary feature from the vector source. Immutable input.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoFeature {
    pub name: String,
    /// Precomputed center point, when the source provides one.
    pub center: Option<LonLat>,
    pub polygons: Vec<GeoPolygon>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    Corrupt(String),
    NotAFeatureCollection,
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::Corrupt(msg) => write!(f, "geojson document corrupt: {msg}"),
            FormatError::NotAFeatureCollection => {
                write!(f, "geojson document is not a feature collection")
            }
        }
    }
}

impl std::error::Error for FormatError {}

/// Parses a GeoJSON feature collection document into boundary features.
///
/// The document is parsed fully before any geometry is built. Features whose
/// geometry is neither `Polygon` nor `MultiPolygon` are skipped.
pub fn parse_feature_collection(doc: &str) -> Result<Vec<GeoFeature>, FormatError> {
    let gj: GeoJson = doc.parse().map_err(|e: geojson::Error| {
        FormatError::Corrupt(e.to_string())
    })?;
    let fc = FeatureCollection::try_from(gj).map_err(|_| FormatError::NotAFeatureCollection)?;

    let mut out = Vec::with_capacity(fc.features.len());
    for feature in fc.features {
        let name = feature
            .properties
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let center = feature
            .properties
            .as_ref()
            .and_then(|p| p.get("center"))
            .and_then(lonlat_from_json);

        let polygons = match feature.geometry.map(|g| g.value) {
            Some(Value::Polygon(rings)) => vec![polygon_from_rings(&rings)],
            Some(Value::MultiPolygon(polys)) => {
                polys.iter().map(|rings| polygon_from_rings(rings)).collect()
            }
            _ => continue,
        };

        out.push(GeoFeature {
            name,
            center,
            polygons,
        });
    }
    Ok(out)
}

fn lonlat_from_json(v: &serde_json::Value) -> Option<LonLat> {
    let arr = v.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    Some(LonLat::new(arr[0].as_f64()?, arr[1].as_f64()?))
}

fn polygon_from_rings(rings: &[Vec<Vec<f64>>]) -> GeoPolygon {
    let rings = rings
        .iter()
        .map(|ring| {
            ring.iter()
                // GeoJSON positions are [lon, lat, ...]; extra ordinates ignored.
                .filter(|pos| pos.len() >= 2)
                .map(|pos| LonLat::new(pos[0], pos[1]))
                .collect()
        })
        .collect();
    GeoPolygon { rings }
}

#[cfg(test)]
mod tests {
    use super::{FormatError, parse_feature_collection};
    use foundation::math::LonLat;
    use pretty_assertions::assert_eq;

    const DOC: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": "昆明市", "center": [102.712251, 25.040609] },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[102.0, 24.0], [103.0, 24.0], [103.0, 26.0], [102.0, 26.0], [102.0, 24.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "name": "islands" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[100.0, 21.0], [100.5, 21.0], [100.5, 21.5], [100.0, 21.0]]],
                        [[[101.0, 22.0], [101.5, 22.0], [101.5, 22.5], [101.0, 22.0]]]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": { "name": "capital point" },
                "geometry": { "type": "Point", "coordinates": [102.7, 25.0] }
            }
        ]
    }"#;

    #[test]
    fn parses_polygons_and_skips_points() {
        let features = parse_feature_collection(DOC).unwrap();
        assert_eq!(features.len(), 2);

        assert_eq!(features[0].name, "昆明市");
        assert_eq!(features[0].center, Some(LonLat::new(102.712251, 25.040609)));
        assert_eq!(features[0].polygons.len(), 1);
        assert_eq!(features[0].polygons[0].rings[0].len(), 5);

        assert_eq!(features[1].name, "islands");
        assert_eq!(features[1].center, None);
        assert_eq!(features[1].polygons.len(), 2);
    }

    #[test]
    fn polygon_holes_are_preserved_in_order() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
                        [[4.0, 4.0], [6.0, 4.0], [6.0, 6.0], [4.0, 6.0], [4.0, 4.0]]
                    ]
                }
            }]
        }"#;
        let features = parse_feature_collection(doc).unwrap();
        let rings = &features[0].polygons[0].rings;
        assert_eq!(rings.len(), 2);
        assert_eq!(rings[0][0], LonLat::new(0.0, 0.0));
        assert_eq!(rings[1][0], LonLat::new(4.0, 4.0));
    }

    #[test]
    fn corrupt_document_is_an_error() {
        let err = parse_feature_collection("{ not json").unwrap_err();
        assert!(matches!(err, FormatError::Corrupt(_)));
    }

    #[test]
    fn non_collection_document_is_an_error() {
        let err = parse_feature_collection(
            r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#,
        )
        .unwrap_err();
        assert_eq!(err, FormatError::NotAFeatureCollection);
    }
}
