//! Area-based filtering
//!
//! Keeps polygons inside `[min_area, max_area]`, then decomposes composite
//! (multi-part) survivors into simple polygons and re-applies the minimum
//! to the parts, removing slivers the decomposition produced. Survivors
//! keep their insertion order.

use geo::Area;
use geo_types::{Geometry, Polygon};
use headwall_core::vector::PolygonSet;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters for the area filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaParams {
    /// Minimum polygon area (CRS linear units squared)
    pub min_area: f64,
    /// Maximum polygon area
    pub max_area: f64,
}

impl Default for AreaParams {
    fn default() -> Self {
        Self {
            min_area: 200.0,
            max_area: 50000.0,
        }
    }
}

/// Unsigned area of a polygon or multi-polygon geometry
pub(crate) fn geometry_area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        _ => 0.0,
    }
}

/// Decompose a composite geometry into independent simple polygons.
///
/// A multi-part input contributes one polygon per part; a simple input
/// passes through unchanged.
pub fn decompose_multipart(geom: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geom {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        _ => Vec::new(),
    }
}

/// Apply the area window and multi-part decomposition.
///
/// The returned set is empty when nothing survives; the caller treats that
/// as the stage's failure signal. Attribute columns are not carried over:
/// decomposition changes the record count, so the output starts a fresh
/// attribute table.
pub fn filter_by_area(set: &PolygonSet, params: &AreaParams) -> PolygonSet {
    let mut survivors: Vec<&Geometry<f64>> = Vec::new();
    let mut removed = 0usize;

    for geom in set.geometries() {
        let area = geometry_area(geom);
        if area > params.max_area || area < params.min_area {
            removed += 1;
            continue;
        }
        survivors.push(geom);
    }

    info!(
        removed,
        remain = survivors.len(),
        "removed polygons based on area"
    );

    let mut parts: Vec<Geometry<f64>> = Vec::new();
    for geom in survivors {
        for poly in decompose_multipart(geom) {
            if poly.unsigned_area() >= params.min_area {
                parts.push(Geometry::Polygon(poly));
            }
        }
    }

    info!(
        remain = parts.len(),
        "decomposed multi-part polygons and removed slivers"
    );

    PolygonSet::from_geometries(parts, set.crs().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, MultiPolygon};

    fn square(origin: f64, side: f64) -> Polygon<f64> {
        polygon![
            (x: origin, y: 0.0),
            (x: origin + side, y: 0.0),
            (x: origin + side, y: side),
            (x: origin, y: side),
            (x: origin, y: 0.0),
        ]
    }

    fn params() -> AreaParams {
        AreaParams {
            min_area: 50.0,
            max_area: 1000.0,
        }
    }

    #[test]
    fn test_area_window() {
        let set = PolygonSet::from_geometries(
            vec![
                Geometry::Polygon(square(0.0, 5.0)),   // 25: too small
                Geometry::Polygon(square(10.0, 10.0)), // 100: keep
                Geometry::Polygon(square(30.0, 40.0)), // 1600: too large
            ],
            None,
        );

        let out = filter_by_area(&set, &params());
        assert_eq!(out.len(), 1);
        assert!((geometry_area(&out.geometries()[0]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_simple_polygon_unchanged_by_decomposition() {
        let poly = square(0.0, 10.0);
        let parts = decompose_multipart(&Geometry::Polygon(poly.clone()));
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0], poly);
    }

    #[test]
    fn test_multipart_decomposition_with_sliver_recheck() {
        // Two parts: one 100, one 4 (sliver below min after decomposition).
        // Combined area 104 passes the window, then the sliver is dropped.
        let mp = MultiPolygon::new(vec![square(0.0, 10.0), square(50.0, 2.0)]);
        let set = PolygonSet::from_geometries(vec![Geometry::MultiPolygon(mp)], None);

        let out = filter_by_area(&set, &params());
        assert_eq!(out.len(), 1);
        assert!((geometry_area(&out.geometries()[0]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_result_signal() {
        let set = PolygonSet::from_geometries(vec![Geometry::Polygon(square(0.0, 2.0))], None);
        let out = filter_by_area(&set, &params());
        assert!(out.is_empty());
    }

    #[test]
    fn test_survivors_keep_insertion_order() {
        let set = PolygonSet::from_geometries(
            vec![
                Geometry::Polygon(square(0.0, 10.0)),
                Geometry::Polygon(square(20.0, 9.0)),
                Geometry::Polygon(square(40.0, 8.0)),
            ],
            None,
        );

        let out = filter_by_area(&set, &params());
        let areas: Vec<f64> = out.geometries().iter().map(geometry_area).collect();
        assert_eq!(out.len(), 3);
        assert!(areas[0] > areas[1] && areas[1] > areas[2]);
    }
}
