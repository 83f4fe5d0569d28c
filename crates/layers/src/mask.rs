use earcutr::earcut;
use foundation::math::Mercator;
use formats::GeoFeature;

/// Stencil reference value written by the mask and tested by every quad.
pub const MASK_REF: u8 = 1;

/// One planar mask shape: an outer boundary plus holes.
///
/// Ring winding from the source is trusted as-is: ring 0 is the outer
/// boundary, every further ring is a hole.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskShape {
    pub outer: Vec<[f64; 2]>,
    pub holes: Vec<Vec<[f64; 2]>>,
}

/// Clip mask covering exactly the area to be overlaid with tiles.
///
/// Built once per feature set and read-only thereafter; a new dataset means
/// discarding and rebuilding the whole mask. The rendering adapter writes
/// `reference` into its stencil buffer over `triangles()` and gives every
/// tile quad the matching equal test.
#[derive(Debug, Clone, PartialEq)]
pub struct StencilMask {
    pub shapes: Vec<MaskShape>,
    pub reference: u8,
}

impl StencilMask {
    pub fn build(features: &[GeoFeature], projection: &Mercator) -> Self {
        let mut shapes = Vec::new();
        for feature in features {
            for polygon in &feature.polygons {
                let mut rings: Vec<Vec<[f64; 2]>> = Vec::with_capacity(polygon.rings.len());
                for ring in &polygon.rings {
                    let mut pts: Vec<[f64; 2]> =
                        ring.iter().map(|p| projection.project(*p)).collect();
                    drop_closing_duplicate(&mut pts);
                    if pts.len() < 3 {
                        continue;
                    }
                    rings.push(pts);
                }
                if rings.is_empty() {
                    continue;
                }
                let outer = rings.remove(0);
                shapes.push(MaskShape {
                    outer,
                    holes: rings,
                });
            }
        }
        Self {
            shapes,
            reference: MASK_REF,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Point-in-mask test: inside some shape's outer ring and not inside any
    /// of that shape's holes (even-odd rule). This is the per-pixel stencil
    /// clip made testable without a graphics context.
    pub fn contains(&self, p: [f64; 2]) -> bool {
        self.shapes.iter().any(|shape| {
            point_in_ring(p, &shape.outer) && !shape.holes.iter().any(|h| point_in_ring(p, h))
        })
    }

    /// Flat triangle list (3 vertices per triangle) for the adapter's mask
    /// write pass.
    pub fn triangles(&self) -> Vec<[f64; 2]> {
        let mut out = Vec::new();
        for shape in &self.shapes {
            out.extend(triangulate_shape(shape));
        }
        out
    }
}

fn drop_closing_duplicate(points: &mut Vec<[f64; 2]>) {
    if points.len() >= 2 {
        let first = points[0];
        let last = *points.last().unwrap();
        if (first[0] - last[0]).abs() < 1e-9 && (first[1] - last[1]).abs() < 1e-9 {
            points.pop();
        }
    }
}

/// Even-odd ray cast against one ring.
fn point_in_ring(p: [f64; 2], ring: &[[f64; 2]]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a[1] > p[1]) != (b[1] > p[1]) {
            let x_cross = (b[0] - a[0]) * (p[1] - a[1]) / (b[1] - a[1]) + a[0];
            if p[0] < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn triangulate_shape(shape: &MaskShape) -> Vec<[f64; 2]> {
    let mut coords: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();
    let mut vertices: Vec<[f64; 2]> = Vec::new();

    for p in &shape.outer {
        coords.push(p[0]);
        coords.push(p[1]);
        vertices.push(*p);
    }
    for hole in &shape.holes {
        hole_indices.push(vertices.len());
        for p in hole {
            coords.push(p[0]);
            coords.push(p[1]);
            vertices.push(*p);
        }
    }

    let indices = match earcut(&coords, &hole_indices, 2) {
        Ok(ix) => ix,
        Err(_) => return Vec::new(),
    };

    let mut out = Vec::with_capacity(indices.len());
    for idx in indices {
        if let Some(v) = vertices.get(idx) {
            out.push(*v);
        }
    }
    out
}
