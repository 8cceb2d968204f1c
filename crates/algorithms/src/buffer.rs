//! Polygon buffer operations
//!
//! Outward buffering regularizes the thin, ragged outlines the mask
//! vectorization produces before width estimation. The buffer is built as
//! the union of the polygon with one disc per exterior vertex and one
//! offset rectangle per exterior edge, which is the Minkowski dilation of
//! the exterior shell by a disc of the requested radius (arcs approximated
//! with `segments` points, as in circle buffering).
//!
//! Interior rings are dropped: the retreat-distance estimator only
//! consumes the exterior shell.

use geo::{Area, BooleanOps};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use std::f64::consts::PI;

/// Parameters for buffer operations
#[derive(Debug, Clone)]
pub struct BufferParams {
    /// Buffer distance (outward)
    pub distance: f64,
    /// Number of segments to approximate circular arcs
    pub segments: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 10.0,
            segments: 16,
        }
    }
}

/// Disc polygon approximating a circle around a point
fn disc(cx: f64, cy: f64, radius: f64, segments: usize) -> Polygon<f64> {
    let n = segments.max(8);
    let mut coords = Vec::with_capacity(n + 1);
    for i in 0..n {
        let angle = 2.0 * PI * i as f64 / n as f64;
        coords.push((cx + radius * angle.cos(), cy + radius * angle.sin()));
    }
    coords.push(coords[0]);
    Polygon::new(LineString::from(coords), vec![])
}

/// Rectangle swept along an edge, offset by the radius on both sides
fn edge_rectangle(a: Coord<f64>, b: Coord<f64>, radius: f64) -> Option<Polygon<f64>> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return None;
    }
    let nx = -dy / len * radius;
    let ny = dx / len * radius;

    Some(Polygon::new(
        LineString::from(vec![
            (a.x + nx, a.y + ny),
            (b.x + nx, b.y + ny),
            (b.x - nx, b.y - ny),
            (a.x - nx, a.y - ny),
            (a.x + nx, a.y + ny),
        ]),
        vec![],
    ))
}

/// Drop redundant collinear vertices from a closed ring. Mask outlines run
/// along cell edges and carry long straight runs of lattice points; pruning
/// them keeps the piece count of the union small without moving the shape.
fn prune_collinear(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let coords = &ring.0;
    if coords.len() < 4 {
        return coords.clone();
    }

    // Work on the open ring (closing point excluded)
    let open = &coords[..coords.len() - 1];
    let n = open.len();
    let mut kept = Vec::with_capacity(n);

    for i in 0..n {
        let prev = open[(i + n - 1) % n];
        let here = open[i];
        let next = open[(i + 1) % n];
        let cross = (here.x - prev.x) * (next.y - here.y) - (here.y - prev.y) * (next.x - here.x);
        if cross != 0.0 {
            kept.push(here);
        }
    }

    if kept.len() < 3 {
        return coords.clone();
    }
    kept.push(kept[0]);
    kept
}

/// Buffer a polygon outward.
///
/// Returns the enlarged exterior shell (holes dropped). Degenerate inputs
/// fall back to a disc around the first vertex.
pub fn buffer_polygon(poly: &Polygon<f64>, params: &BufferParams) -> Polygon<f64> {
    let radius = params.distance.abs();
    let ring = prune_collinear(poly.exterior());

    if ring.len() < 4 {
        let c = ring.first().copied().unwrap_or(Coord { x: 0.0, y: 0.0 });
        return disc(c.x, c.y, radius, params.segments);
    }

    let shell = Polygon::new(LineString::from(ring.clone()), vec![]);
    let mut result = MultiPolygon::new(vec![shell]);

    for w in ring.windows(2) {
        if let Some(rect) = edge_rectangle(w[0], w[1], radius) {
            result = result.union(&MultiPolygon::new(vec![rect]));
        }
    }
    // Open ring vertices; the closing point duplicates the first
    for c in &ring[..ring.len() - 1] {
        let d = disc(c.x, c.y, radius, params.segments);
        result = result.union(&MultiPolygon::new(vec![d]));
    }

    // The union of overlapping pieces around one shell is a single polygon;
    // keep the largest part if numerical noise splinters it.
    result
        .0
        .into_iter()
        .max_by(|a, b| {
            a.unsigned_area()
                .partial_cmp(&b.unsigned_area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|p| Polygon::new(p.exterior().clone(), vec![]))
        .unwrap_or_else(|| disc(0.0, 0.0, radius, params.segments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn rectangle(w: f64, h: f64) -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: w, y: 0.0),
            (x: w, y: h),
            (x: 0.0, y: h),
            (x: 0.0, y: 0.0),
        ]
    }

    #[test]
    fn test_buffered_rectangle_area() {
        let poly = rectangle(20.0, 5.0);
        let buffered = buffer_polygon(
            &poly,
            &BufferParams {
                distance: 10.0,
                segments: 32,
            },
        );

        // Exact dilation area: A + perimeter*r + pi*r^2
        let expected = 100.0 + 50.0 * 10.0 + PI * 100.0;
        let actual = buffered.unsigned_area();
        let error = (actual - expected).abs() / expected;
        assert!(
            error < 0.02,
            "dilated area error {:.2}% (expected {:.1}, got {:.1})",
            error * 100.0,
            expected,
            actual
        );
    }

    #[test]
    fn test_buffer_contains_original_bounds() {
        use geo::BoundingRect;

        let poly = rectangle(20.0, 5.0);
        let buffered = buffer_polygon(&poly, &BufferParams::default());

        let bounds = buffered.bounding_rect().unwrap();
        assert!(bounds.min().x <= -9.9 && bounds.max().x >= 29.9);
        assert!(bounds.min().y <= -9.9 && bounds.max().y >= 14.9);
    }

    #[test]
    fn test_prune_collinear_keeps_shape() {
        // Rectangle traced through lattice points: 8 collinear midpoints
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 1.0),
            (x: 2.0, y: 2.0),
            (x: 1.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        let pruned = prune_collinear(poly.exterior());
        assert_eq!(pruned.len(), 5); // 4 corners + closing point

        let as_poly = Polygon::new(LineString::from(pruned), vec![]);
        assert!((as_poly.unsigned_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_concave_polygon_buffer_is_single_part() {
        // L-shape
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 30.0, y: 0.0),
            (x: 30.0, y: 10.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 30.0),
            (x: 0.0, y: 30.0),
            (x: 0.0, y: 0.0),
        ];
        let buffered = buffer_polygon(
            &poly,
            &BufferParams {
                distance: 5.0,
                segments: 16,
            },
        );
        assert!(buffered.unsigned_area() > poly.unsigned_area());
        assert!(buffered.interiors().is_empty());
    }
}
