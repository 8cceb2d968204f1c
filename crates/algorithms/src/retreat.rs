//! Retreat-distance width estimation
//!
//! Estimates each polygon's maximum internal width by contracting its
//! boundary: the maximum distance a boundary point travels inward before
//! the interior is exhausted equals the maximum inscribed-circle radius,
//! and twice that radius approximates the medial-axis width.
//!
//! The estimator samples the polygon's exterior shell on a local grid and
//! runs the exact Euclidean distance transform (Felzenszwalb–Huttenlocher,
//! two 1-D passes over squared distances). Ridge cells — local maxima of
//! the transform — are the sampled medial axis; the reported statistics
//! are over their doubled radii. Accuracy is bounded by the grid
//! resolution (longest bounding-box side / `grid_cells`).

use geo::BoundingRect;
use geo_types::{Coord, Polygon};
use headwall_core::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Per-polygon width statistics from the retreat computation.
///
/// Only `max_dis` drives filtering; the remaining statistics are persisted
/// alongside it for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WidthStats {
    pub min_dis: f64,
    pub max_dis: f64,
    pub mean_dis: f64,
    pub median_dis: f64,
}

/// Capability interface for the width estimation service.
///
/// Contract: the output holds one entry per input polygon **in input
/// order**; implementations may fan work out across a bounded worker pool
/// and may write auxiliary artifact files, but must never reorder results.
pub trait WidthEstimator {
    fn estimate(&self, polygons: &[Polygon<f64>], parallelism: usize) -> Result<Vec<WidthStats>>;
}

/// Grid-based retreat-distance estimator.
#[derive(Debug, Clone)]
pub struct RetreatDistance {
    /// Grid cells along the longer bounding-box side
    pub grid_cells: usize,
    /// Write per-polygon medial-axis radius artifacts
    pub save_medial_axis: bool,
    /// Directory for artifact files (current directory when unset)
    pub artifact_dir: Option<PathBuf>,
}

impl Default for RetreatDistance {
    fn default() -> Self {
        Self {
            grid_cells: 512,
            save_medial_axis: false,
            artifact_dir: None,
        }
    }
}

/// Prefix of the medial-axis artifact files, shared with the cleanup in
/// the width stage.
pub const MEDIAL_AXIS_ARTIFACT_PREFIX: &str = "medial_axis_radius_";

impl WidthEstimator for RetreatDistance {
    fn estimate(&self, polygons: &[Polygon<f64>], parallelism: usize) -> Result<Vec<WidthStats>> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(parallelism.max(1))
                .build()
                .map_err(|e| Error::Algorithm(format!("worker pool: {}", e)))?;

            pool.install(|| {
                polygons
                    .par_iter()
                    .enumerate()
                    .map(|(idx, poly)| self.estimate_one(poly, idx))
                    .collect()
            })
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = parallelism;
            polygons
                .iter()
                .enumerate()
                .map(|(idx, poly)| self.estimate_one(poly, idx))
                .collect()
        }
    }
}

impl RetreatDistance {
    fn estimate_one(&self, poly: &Polygon<f64>, idx: usize) -> Result<WidthStats> {
        let Some(bounds) = poly.bounding_rect() else {
            return Ok(WidthStats::default());
        };

        let width = bounds.width();
        let height = bounds.height();
        let longer = width.max(height);
        if longer <= 0.0 {
            return Ok(WidthStats::default());
        }

        let cell = longer / self.grid_cells.max(16) as f64;
        // Two-cell margin keeps the background reachable on every side
        let nx = (width / cell).ceil() as usize + 4;
        let ny = (height / cell).ceil() as usize + 4;
        let min_x = bounds.min().x - 2.0 * cell;
        let min_y = bounds.min().y - 2.0 * cell;

        let interior = rasterize_exterior(poly, min_x, min_y, cell, nx, ny);
        let dist_sq = distance_transform(&interior, nx, ny);

        // Ridge cells: local maxima of the transform sample the medial axis
        let mut radii: Vec<f64> = Vec::new();
        let mut max_sq = 0.0f64;
        for j in 0..ny {
            for i in 0..nx {
                let d = dist_sq[j * nx + i];
                if d <= 0.0 {
                    continue;
                }
                max_sq = max_sq.max(d);

                let mut is_ridge = true;
                'scan: for dj in -1i64..=1 {
                    for di in -1i64..=1 {
                        if di == 0 && dj == 0 {
                            continue;
                        }
                        let njj = j as i64 + dj;
                        let nii = i as i64 + di;
                        if njj < 0 || nii < 0 || njj >= ny as i64 || nii >= nx as i64 {
                            continue;
                        }
                        if dist_sq[njj as usize * nx + nii as usize] > d {
                            is_ridge = false;
                            break 'scan;
                        }
                    }
                }
                if is_ridge {
                    radii.push(d.sqrt() * cell);
                }
            }
        }

        if self.save_medial_axis {
            self.write_artifact(idx, &radii)?;
        }

        if radii.is_empty() {
            return Ok(WidthStats::default());
        }

        radii.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let widths: Vec<f64> = radii.iter().map(|r| 2.0 * r).collect();
        let mean = widths.iter().sum::<f64>() / widths.len() as f64;
        let median = widths[widths.len() / 2];

        Ok(WidthStats {
            min_dis: widths[0],
            max_dis: 2.0 * max_sq.sqrt() * cell,
            mean_dis: mean,
            median_dis: median,
        })
    }

    fn write_artifact(&self, idx: usize, radii: &[f64]) -> Result<()> {
        let dir = self
            .artifact_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let path = dir.join(format!("{}{}.txt", MEDIAL_AXIS_ARTIFACT_PREFIX, idx));
        debug!(path = %path.display(), "writing medial-axis artifact");

        let mut file = fs::File::create(&path)?;
        for r in radii {
            writeln!(file, "{}", r)?;
        }
        Ok(())
    }
}

/// Scanline fill of the exterior shell: true = interior cell.
fn rasterize_exterior(
    poly: &Polygon<f64>,
    min_x: f64,
    min_y: f64,
    cell: f64,
    nx: usize,
    ny: usize,
) -> Vec<bool> {
    let ring: &[Coord<f64>] = &poly.exterior().0;
    let mut interior = vec![false; nx * ny];
    if ring.len() < 4 {
        return interior;
    }

    for j in 0..ny {
        let y = min_y + (j as f64 + 0.5) * cell;

        let mut crossings: Vec<f64> = Vec::new();
        for w in ring.windows(2) {
            let (p, q) = (w[0], w[1]);
            if (p.y > y) != (q.y > y) {
                crossings.push(p.x + (y - p.y) * (q.x - p.x) / (q.y - p.y));
            }
        }
        crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        // Even-odd fill between crossing pairs
        let mut k = 0usize;
        for i in 0..nx {
            let x = min_x + (i as f64 + 0.5) * cell;
            while k < crossings.len() && crossings[k] < x {
                k += 1;
            }
            if k % 2 == 1 {
                interior[j * nx + i] = true;
            }
        }
    }

    interior
}

const INF: f64 = 1e20;

/// Exact squared Euclidean distance transform (distance to the nearest
/// background cell), two 1-D lower-envelope passes.
fn distance_transform(interior: &[bool], nx: usize, ny: usize) -> Vec<f64> {
    let mut grid: Vec<f64> = interior.iter().map(|&b| if b { INF } else { 0.0 }).collect();

    // Columns
    let mut column = vec![0.0f64; ny];
    for i in 0..nx {
        for j in 0..ny {
            column[j] = grid[j * nx + i];
        }
        let transformed = dt_1d(&column);
        for j in 0..ny {
            grid[j * nx + i] = transformed[j];
        }
    }

    // Rows
    for j in 0..ny {
        let row: Vec<f64> = grid[j * nx..(j + 1) * nx].to_vec();
        let transformed = dt_1d(&row);
        grid[j * nx..(j + 1) * nx].copy_from_slice(&transformed);
    }

    grid
}

/// 1-D squared distance transform via the lower envelope of parabolas
fn dt_1d(f: &[f64]) -> Vec<f64> {
    let n = f.len();
    let mut d = vec![0.0f64; n];
    if n == 0 {
        return d;
    }

    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    v[0] = 0;
    z[0] = -INF;
    z[1] = INF;

    for q in 1..n {
        let mut s;
        loop {
            let p = v[k];
            s = ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64))
                / (2.0 * q as f64 - 2.0 * p as f64);
            if s <= z[k] && k > 0 {
                k -= 1;
            } else {
                break;
            }
        }
        k += 1;
        v[k] = q;
        z[k] = s;
        z[k + 1] = INF;
    }

    k = 0;
    for q in 0..n {
        while z[k + 1] < q as f64 {
            k += 1;
        }
        let p = v[k];
        let dq = q as f64 - p as f64;
        d[q] = dq * dq + f[p];
    }

    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{buffer_polygon, BufferParams};
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
    fn test_dt_1d_simple() {
        // Background at both ends, interior between
        let f = [0.0, INF, INF, INF, 0.0];
        let d = dt_1d(&f);
        assert_eq!(d[0], 0.0);
        assert_eq!(d[1], 1.0);
        assert_eq!(d[2], 4.0);
        assert_eq!(d[3], 1.0);
        assert_eq!(d[4], 0.0);
    }

    #[test]
    fn test_rectangle_width() {
        // A 40x25 rectangle has maximum inscribed radius 12.5
        let est = RetreatDistance::default();
        let stats = est.estimate(&[rectangle(40.0, 25.0)], 1).unwrap();
        assert_eq!(stats.len(), 1);

        let max = stats[0].max_dis;
        assert!(
            (max - 25.0).abs() < 0.5,
            "expected width ~25, got {}",
            max
        );
        assert!(stats[0].min_dis <= stats[0].median_dis);
        assert!(stats[0].median_dis <= stats[0].max_dis + 1e-9);
    }

    #[test]
    fn test_narrow_rectangle_width() {
        let est = RetreatDistance::default();
        let stats = est.estimate(&[rectangle(20.0, 5.0)], 1).unwrap();
        let max = stats[0].max_dis;
        assert!((max - 5.0).abs() < 0.3, "expected width ~5, got {}", max);
    }

    #[test]
    fn test_order_preserved() {
        let polys = vec![
            rectangle(20.0, 5.0),
            rectangle(40.0, 25.0),
            rectangle(10.0, 3.0),
        ];
        let est = RetreatDistance::default();
        let stats = est.estimate(&polys, 4).unwrap();

        assert_eq!(stats.len(), 3);
        assert!((stats[0].max_dis - 5.0).abs() < 0.3);
        assert!((stats[1].max_dis - 25.0).abs() < 0.5);
        assert!((stats[2].max_dis - 3.0).abs() < 0.3);
    }

    #[test]
    fn test_buffer_then_correct_matches_direct() {
        // Buffering by r then subtracting 2r reproduces the direct estimate
        let poly = rectangle(20.0, 5.0);
        let est = RetreatDistance::default();

        let direct = est.estimate(&[poly.clone()], 1).unwrap()[0].max_dis;

        let buffered = buffer_polygon(
            &poly,
            &BufferParams {
                distance: 10.0,
                segments: 32,
            },
        );
        let enlarged = est.estimate(&[buffered], 1).unwrap()[0].max_dis;
        let corrected = enlarged - 2.0 * 10.0;

        assert!(
            (corrected - direct).abs() < 0.5,
            "direct {} vs corrected {}",
            direct,
            corrected
        );
    }

    #[test]
    fn test_degenerate_polygon() {
        let poly = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ];
        let est = RetreatDistance::default();
        let stats = est.estimate(&[poly], 1).unwrap();
        assert_eq!(stats[0].max_dis, 0.0);
    }

    #[test]
    fn test_artifact_files() {
        let dir = tempfile::tempdir().unwrap();
        let est = RetreatDistance {
            save_medial_axis: true,
            artifact_dir: Some(dir.path().to_path_buf()),
            ..RetreatDistance::default()
        };

        est.estimate(&[rectangle(20.0, 5.0)], 1).unwrap();

        let artifact = dir.path().join(format!("{}0.txt", MEDIAL_AXIS_ARTIFACT_PREFIX));
        assert!(artifact.exists());
        let content = std::fs::read_to_string(artifact).unwrap();
        assert!(!content.trim().is_empty());
    }
}
