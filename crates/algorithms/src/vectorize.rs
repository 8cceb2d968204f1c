//! Raster-to-polygon vectorization
//!
//! Extracts connected components from a binary mask and traces their
//! boundaries into polygons. Components are found by BFS labeling with
//! 4- or 8-connectivity; boundaries are built by chaining the directed
//! cell-edge segments between foreground and background, then mapping the
//! lattice rings through the raster's geotransform.
//!
//! Output order is deterministic: components appear in row-major order of
//! their first cell, and every component contributes exactly one geometry
//! (a `Polygon`, or a `MultiPolygon` in the rare 4-connectivity pinch case
//! where one component's boundary decomposes into several exterior rings).

use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use headwall_core::raster::Raster;
use headwall_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Cell connectivity for component labeling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connectivity {
    /// Edge neighbors only
    Four,
    /// Edge and corner neighbors
    #[default]
    Eight,
}

/// Vectorize a binary mask into one geometry per connected component.
///
/// Foreground is any cell value above zero. An empty vector means the mask
/// contains no extractable component; the caller decides whether that is a
/// failure.
pub fn vectorize_mask(mask: &Raster<u8>, connectivity: Connectivity) -> Result<Vec<Geometry<f64>>> {
    let (rows, cols) = mask.shape();
    let labels = label_components(mask, connectivity);

    let mut component_count = 0usize;
    for &l in &labels {
        component_count = component_count.max(l as usize);
    }

    let mut geometries = Vec::with_capacity(component_count);
    for label in 1..=component_count as u32 {
        let rings = trace_rings(&labels, rows, cols, label, connectivity);
        if let Some(geom) = assemble_rings(rings, mask) {
            geometries.push(geom);
        }
    }

    Ok(geometries)
}

/// BFS component labeling. Returns a row-major label grid, 0 = background.
fn label_components(mask: &Raster<u8>, connectivity: Connectivity) -> Vec<u32> {
    let (rows, cols) = mask.shape();
    let mut labels = vec![0u32; rows * cols];
    let mut next_label = 0u32;

    let offsets: &[(isize, isize)] = match connectivity {
        Connectivity::Four => &[(-1, 0), (1, 0), (0, -1), (0, 1)],
        Connectivity::Eight => &[
            (-1, -1),
            (-1, 0),
            (-1, 1),
            (0, -1),
            (0, 1),
            (1, -1),
            (1, 0),
            (1, 1),
        ],
    };

    let mut queue = VecDeque::new();
    for row in 0..rows {
        for col in 0..cols {
            let idx = row * cols + col;
            if labels[idx] != 0 || mask.data()[(row, col)] == 0 {
                continue;
            }

            next_label += 1;
            labels[idx] = next_label;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                for &(dr, dc) in offsets {
                    let nr = r as isize + dr;
                    let nc = c as isize + dc;
                    if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                        continue;
                    }
                    let nidx = nr as usize * cols + nc as usize;
                    if labels[nidx] == 0 && mask.data()[(nr as usize, nc as usize)] != 0 {
                        labels[nidx] = next_label;
                        queue.push_back((nr as usize, nc as usize));
                    }
                }
            }
        }
    }

    labels
}

/// A closed lattice ring (first point repeated last)
type LatticeRing = Vec<(i64, i64)>;

/// Trace the boundary rings of one labeled component.
///
/// Each boundary side of a component cell contributes one directed edge,
/// oriented so the component interior lies to the right of travel (in
/// row-down lattice coordinates). Chaining the edges yields closed rings:
/// positive shoelace area = exterior, negative = hole.
fn trace_rings(
    labels: &[u32],
    rows: usize,
    cols: usize,
    label: u32,
    connectivity: Connectivity,
) -> Vec<LatticeRing> {
    let at = |r: isize, c: isize| -> u32 {
        if r < 0 || c < 0 || r as usize >= rows || c as usize >= cols {
            0
        } else {
            labels[r as usize * cols + c as usize]
        }
    };

    // Directed edges between lattice points, one per exposed cell side.
    let mut edges: Vec<((i64, i64), (i64, i64))> = Vec::new();
    for row in 0..rows as isize {
        for col in 0..cols as isize {
            if at(row, col) != label {
                continue;
            }
            let (x, y) = (col as i64, row as i64);
            if at(row - 1, col) != label {
                edges.push(((x, y), (x + 1, y))); // top
            }
            if at(row, col + 1) != label {
                edges.push(((x + 1, y), (x + 1, y + 1))); // right
            }
            if at(row + 1, col) != label {
                edges.push(((x + 1, y + 1), (x, y + 1))); // bottom
            }
            if at(row, col - 1) != label {
                edges.push(((x, y + 1), (x, y))); // left
            }
        }
    }

    let mut by_start: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, edge) in edges.iter().enumerate() {
        by_start.entry(edge.0).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }

        let mut ring: LatticeRing = vec![edges[start].0];
        let mut current = start;

        loop {
            used[current] = true;
            let (_, end) = edges[current];
            ring.push(end);

            if end == ring[0] {
                break;
            }

            let candidates = match by_start.get(&end) {
                Some(c) => c,
                None => break, // cannot happen for a well-formed edge set
            };
            let open: Vec<usize> = candidates.iter().copied().filter(|&i| !used[i]).collect();

            current = match open.len() {
                0 => break,
                1 => open[0],
                _ => {
                    // Saddle point: two diagonal cells of the component meet.
                    // 8-connectivity keeps them in one ring (pass through);
                    // 4-connectivity splits into separate rings.
                    let (sx, sy) = edges[current].0;
                    let dir = (end.0 - sx, end.1 - sy);
                    let preferred = match connectivity {
                        Connectivity::Eight => (dir.1, -dir.0),
                        Connectivity::Four => (-dir.1, dir.0),
                    };
                    open.iter()
                        .copied()
                        .find(|&i| {
                            let ((ax, ay), (bx, by)) = edges[i];
                            (bx - ax, by - ay) == preferred
                        })
                        .unwrap_or(open[0])
                }
            };
        }

        if ring.len() >= 4 && ring[0] == ring[ring.len() - 1] {
            rings.push(ring);
        }
    }

    rings
}

/// Signed shoelace area of a lattice ring (positive for our exterior
/// orientation, negative for holes).
fn lattice_area(ring: &LatticeRing) -> f64 {
    let mut sum = 0i64;
    for w in ring.windows(2) {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        sum += x0 * y1 - x1 * y0;
    }
    sum as f64 / 2.0
}

/// Even-odd ray-casting test in lattice coordinates
fn point_in_ring(px: f64, py: f64, ring: &LatticeRing) -> bool {
    let mut inside = false;
    for w in ring.windows(2) {
        let (x0, y0) = (w[0].0 as f64, w[0].1 as f64);
        let (x1, y1) = (w[1].0 as f64, w[1].1 as f64);
        if (y0 > py) != (y1 > py) {
            let x_cross = x0 + (py - y0) * (x1 - x0) / (y1 - y0);
            if px < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Classify rings into exteriors and holes, assign holes to their smallest
/// containing exterior, and map everything through the geotransform.
fn assemble_rings(rings: Vec<LatticeRing>, mask: &Raster<u8>) -> Option<Geometry<f64>> {
    let mut exteriors: Vec<(LatticeRing, f64)> = Vec::new();
    let mut holes: Vec<LatticeRing> = Vec::new();

    for ring in rings {
        let area = lattice_area(&ring);
        if area > 0.0 {
            exteriors.push((ring, area));
        } else if area < 0.0 {
            holes.push(ring);
        }
    }

    if exteriors.is_empty() {
        return None;
    }

    // Assign each hole to the smallest exterior that contains it. The
    // sample point sits half a cell into the cavity: for a hole edge the
    // component interior is at (-dy, dx), so the cavity is at (dy, -dx).
    let mut hole_assignment: Vec<Vec<LatticeRing>> = vec![Vec::new(); exteriors.len()];
    for hole in holes {
        let (ax, ay) = hole[0];
        let (bx, by) = hole[1];
        let (dx, dy) = ((bx - ax) as f64, (by - ay) as f64);
        let mx = (ax as f64 + bx as f64) / 2.0 + dy * 0.5;
        let my = (ay as f64 + by as f64) / 2.0 - dx * 0.5;

        let mut best: Option<(usize, f64)> = None;
        for (i, (ext, area)) in exteriors.iter().enumerate() {
            if point_in_ring(mx, my, ext) {
                match best {
                    Some((_, a)) if a <= *area => {}
                    _ => best = Some((i, *area)),
                }
            }
        }
        if let Some((i, _)) = best {
            hole_assignment[i].push(hole);
        }
    }

    let gt = mask.transform();
    let to_geo = |ring: &LatticeRing| -> LineString<f64> {
        LineString::from(
            ring.iter()
                .map(|&(x, y)| {
                    let (gx, gy) = gt.lattice_to_geo(x as usize, y as usize);
                    Coord { x: gx, y: gy }
                })
                .collect::<Vec<_>>(),
        )
    };

    let mut polygons: Vec<Polygon<f64>> = Vec::with_capacity(exteriors.len());
    for (i, (ext, _)) in exteriors.iter().enumerate() {
        let interiors = hole_assignment[i].iter().map(&to_geo).collect();
        polygons.push(Polygon::new(to_geo(ext), interiors));
    }

    if polygons.len() == 1 {
        polygons.pop().map(Geometry::Polygon)
    } else {
        Some(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn mask_from_cells(rows: usize, cols: usize, cells: &[(usize, usize)]) -> Raster<u8> {
        let mut mask: Raster<u8> = Raster::new(rows, cols);
        for &(r, c) in cells {
            mask.set(r, c, 255).unwrap();
        }
        mask
    }

    fn unsigned_area(geom: &Geometry<f64>) -> f64 {
        match geom {
            Geometry::Polygon(p) => p.unsigned_area(),
            Geometry::MultiPolygon(mp) => mp.unsigned_area(),
            _ => 0.0,
        }
    }

    #[test]
    fn test_empty_mask() {
        let mask = mask_from_cells(10, 10, &[]);
        let geoms = vectorize_mask(&mask, Connectivity::Eight).unwrap();
        assert!(geoms.is_empty());
    }

    #[test]
    fn test_single_rectangle() {
        let cells: Vec<(usize, usize)> = (2..7)
            .flat_map(|r| (3..23).map(move |c| (r, c)))
            .collect();
        let mask = mask_from_cells(10, 30, &cells);

        let geoms = vectorize_mask(&mask, Connectivity::Eight).unwrap();
        assert_eq!(geoms.len(), 1);
        assert!((unsigned_area(&geoms[0]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_separate_blobs() {
        let mask = mask_from_cells(10, 10, &[(1, 1), (1, 2), (7, 7)]);
        let geoms = vectorize_mask(&mask, Connectivity::Eight).unwrap();
        assert_eq!(geoms.len(), 2);
    }

    #[test]
    fn test_diagonal_pair_connectivity() {
        let mask = mask_from_cells(5, 5, &[(1, 1), (2, 2)]);

        let eight = vectorize_mask(&mask, Connectivity::Eight).unwrap();
        assert_eq!(eight.len(), 1, "8-connectivity joins diagonal cells");
        assert!((unsigned_area(&eight[0]) - 2.0).abs() < 1e-9);

        let four = vectorize_mask(&mask, Connectivity::Four).unwrap();
        assert_eq!(four.len(), 2, "4-connectivity separates diagonal cells");
    }

    #[test]
    fn test_donut_has_hole() {
        // 5x5 ring of cells with an empty center
        let cells: Vec<(usize, usize)> = (1..6)
            .flat_map(|r| (1..6).map(move |c| (r, c)))
            .filter(|&(r, c)| !(2..5).contains(&r) || !(2..5).contains(&c))
            .collect();
        let mask = mask_from_cells(8, 8, &cells);

        let geoms = vectorize_mask(&mask, Connectivity::Eight).unwrap();
        assert_eq!(geoms.len(), 1);

        match &geoms[0] {
            Geometry::Polygon(p) => {
                assert_eq!(p.interiors().len(), 1, "expected one hole");
                // 25 outer minus 9 inner
                assert!((p.unsigned_area() - 16.0).abs() < 1e-9);
            }
            other => panic!("expected a Polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_geo_coordinates_follow_transform() {
        let mut mask = mask_from_cells(4, 4, &[(0, 0)]);
        mask.set_transform(headwall_core::GeoTransform::new(100.0, 200.0, 10.0, -10.0));

        let geoms = vectorize_mask(&mask, Connectivity::Eight).unwrap();
        assert_eq!(geoms.len(), 1);
        // One 10x10 map-unit cell anchored at the origin corner
        assert!((unsigned_area(&geoms[0]) - 100.0).abs() < 1e-9);
        if let Geometry::Polygon(p) = &geoms[0] {
            let xs: Vec<f64> = p.exterior().coords().map(|c| c.x).collect();
            assert!(xs.iter().all(|&x| (100.0..=110.0).contains(&x)));
        }
    }
}
