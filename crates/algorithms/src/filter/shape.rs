//! Shape-descriptor filtering
//!
//! Computes each polygon's minimum-area rotated bounding rectangle and
//! removes polygons whose long side exceeds the maximum: headwall scarps
//! are narrow features, and a very long box betrays a ridge line or
//! terrace edge instead.

use geo::{Area, MinimumRotatedRect};
use geo_types::Geometry;
use headwall_core::vector::PolygonSet;
use headwall_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Attribute name for the rotated-rectangle short side
pub const WIDTH_FIELD: &str = "WIDTH";
/// Attribute name for the rotated-rectangle long side
pub const HEIGHT_FIELD: &str = "HEIGHT";

/// Per-polygon shape descriptor from the minimum rotated rectangle.
///
/// Normalized so `width <= height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeInfo {
    pub width: f64,
    pub height: f64,
}

impl ShapeInfo {
    /// The rectangle's long side
    pub fn long_side(&self) -> f64 {
        self.width.max(self.height)
    }
}

/// Parameters for the shape filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeParams {
    /// Maximum acceptable rotated-bounding-box long side
    pub max_box_wh: f64,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self { max_box_wh: 600.0 }
    }
}

/// Compute the minimum rotated rectangle's side lengths for a geometry.
///
/// Degenerate geometries (fewer than three distinct vertices) yield a zero
/// descriptor, which no maximum-side filter removes.
pub fn polygon_shape_info(geom: &Geometry<f64>) -> ShapeInfo {
    let rect = match geom {
        Geometry::Polygon(p) => p.minimum_rotated_rect(),
        Geometry::MultiPolygon(mp) => mp.minimum_rotated_rect(),
        _ => None,
    };

    let Some(rect) = rect else {
        return ShapeInfo {
            width: 0.0,
            height: 0.0,
        };
    };

    if rect.unsigned_area() == 0.0 {
        return ShapeInfo {
            width: 0.0,
            height: 0.0,
        };
    }

    let coords: Vec<_> = rect.exterior().coords().collect();
    if coords.len() < 3 {
        return ShapeInfo {
            width: 0.0,
            height: 0.0,
        };
    }

    let side = |a: usize, b: usize| -> f64 {
        let dx = coords[b].x - coords[a].x;
        let dy = coords[b].y - coords[a].y;
        (dx * dx + dy * dy).sqrt()
    };

    let s1 = side(0, 1);
    let s2 = side(1, 2);

    ShapeInfo {
        width: s1.min(s2),
        height: s1.max(s2),
    }
}

/// Remove polygons whose recorded box long side exceeds the maximum.
///
/// Reads the `WIDTH`/`HEIGHT` columns the caller attached beforehand (the
/// stage re-reads its persisted file first, so the surviving rows keep
/// consistent attributes).
pub fn filter_by_box(set: &PolygonSet, params: &ShapeParams) -> Result<PolygonSet> {
    let widths = set.column(WIDTH_FIELD).ok_or_else(|| Error::MissingField {
        field: WIDTH_FIELD.to_string(),
        path: "<polygon set>".to_string(),
    })?;
    let heights = set.column(HEIGHT_FIELD).ok_or_else(|| Error::MissingField {
        field: HEIGHT_FIELD.to_string(),
        path: "<polygon set>".to_string(),
    })?;

    let keep: Vec<usize> = (0..set.len())
        .filter(|&i| widths[i].max(heights[i]) <= params.max_box_wh)
        .collect();

    info!(
        removed = set.len() - keep.len(),
        remain = keep.len(),
        "removed polygons based on rotated-box side"
    );

    Ok(set.subset(&keep))
}
