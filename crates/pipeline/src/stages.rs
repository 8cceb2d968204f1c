//! Per-stage file protocols
//!
//! Each stage reads its predecessor's persisted file, writes its own
//! output, and is skipped entirely when that output already exists. The
//! medial-axis stage additionally requires its cached intermediate to
//! carry the width field; a cached file without it is recomputed rather
//! than trusted.

use crate::cache;
use crate::config::{ExtractParams, Workspace};
use geo_types::{Geometry, Polygon};
use headwall_algorithms::buffer::{buffer_polygon, BufferParams};
use headwall_algorithms::filter::{
    correct_widths, decompose_multipart, filter_by_area, filter_by_box, polygon_shape_info,
    remove_larger, E_MAX_DIS, HEIGHT_FIELD, POLY_ID, WIDTH_FIELD,
};
use headwall_algorithms::mask::slope_to_mask;
use headwall_algorithms::retreat::{
    RetreatDistance, WidthEstimator, MEDIAL_AXIS_ARTIFACT_PREFIX,
};
use headwall_algorithms::vectorize::vectorize_mask;
use headwall_core::io::{read_geotiff, write_geotiff, GeoTiffOptions};
use headwall_core::vector::{attach_attributes, has_field, read_polygon_set, write_polygon_set};
use headwall_core::{Error, PolygonSet, Raster, Result, CRS};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// What a gated stage produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StageStatus {
    /// Output exists (computed now or cached); the pipeline continues
    Completed,
    /// The stage removed every candidate; the raster fails
    Empty,
}

/// Threshold the slope raster into the persisted binary mask.
///
/// Returns the source CRS so later stages can propagate it (the native
/// mask file does not carry one).
pub(crate) fn mask_stage(
    slope_tif: &Path,
    bin_path: &Path,
    params: &ExtractParams,
) -> Result<Option<CRS>> {
    if cache::is_cached(bin_path) {
        info!(path = %bin_path.display(), "exists, skip building binary mask");
        cache::warn_if_params_changed(bin_path, &params.mask);
        // Re-read only the CRS of the source for propagation
        let slope: Raster<f64> = read_geotiff(slope_tif, None)?;
        return Ok(slope.crs().cloned());
    }

    let slope: Raster<f64> = read_geotiff(slope_tif, None)?;
    let crs = slope.crs().cloned();
    let mask = slope_to_mask(&slope, &params.mask)?;
    write_geotiff(&mask, bin_path, Some(GeoTiffOptions::default()))?;
    cache::record_params(bin_path, &params.mask);

    Ok(crs)
}

/// Vectorize the persisted mask into the raw candidate polygons.
pub(crate) fn vectorize_stage(
    bin_path: &Path,
    out_path: &Path,
    crs: Option<CRS>,
    params: &ExtractParams,
) -> Result<StageStatus> {
    if cache::is_cached(out_path) {
        info!(path = %out_path.display(), "exists, skip vectorizing mask");
        cache::warn_if_params_changed(out_path, &params.connectivity);
        return Ok(StageStatus::Completed);
    }

    let mask: Raster<u8> = read_geotiff(bin_path, None)?;
    let geoms = vectorize_mask(&mask, params.connectivity)?;
    if geoms.is_empty() {
        return Ok(StageStatus::Empty);
    }

    let set = PolygonSet::from_geometries(geoms, crs);
    write_polygon_set(&set, out_path)?;
    cache::record_params(out_path, &params.connectivity);

    Ok(StageStatus::Completed)
}

/// Area window + multi-part decomposition.
pub(crate) fn area_stage(
    input: &Path,
    output: &Path,
    params: &ExtractParams,
) -> Result<StageStatus> {
    if cache::is_cached(output) {
        info!(path = %output.display(), "exists, skip removing based on area");
        cache::warn_if_params_changed(output, &params.area);
        return Ok(StageStatus::Completed);
    }

    let set = read_polygon_set(input)?;
    let filtered = filter_by_area(&set, &params.area);
    if filtered.is_empty() {
        return Ok(StageStatus::Empty);
    }

    write_polygon_set(&filtered, output)?;
    cache::record_params(output, &params.area);

    Ok(StageStatus::Completed)
}

/// Shape descriptors + long-side filter.
///
/// The descriptors are first attached to the *input* file and the file is
/// re-read before filtering, so the unfiltered set on disk keeps the full
/// attribute table for inspection.
pub(crate) fn shape_stage(
    input: &Path,
    output: &Path,
    params: &ExtractParams,
) -> Result<StageStatus> {
    if cache::is_cached(output) {
        info!(path = %output.display(), "exists, skip removing based on shape");
        cache::warn_if_params_changed(output, &params.shape);
        return Ok(StageStatus::Completed);
    }

    let set = read_polygon_set(input)?;
    let infos: Vec<_> = set.geometries().iter().map(polygon_shape_info).collect();

    let mut columns = BTreeMap::new();
    columns.insert(
        WIDTH_FIELD.to_string(),
        infos.iter().map(|i| i.width).collect(),
    );
    columns.insert(
        HEIGHT_FIELD.to_string(),
        infos.iter().map(|i| i.height).collect(),
    );
    attach_attributes(input, &columns)?;

    let set = read_polygon_set(input)?;
    let filtered = filter_by_box(&set, &params.shape)?;
    if filtered.is_empty() {
        return Ok(StageStatus::Empty);
    }

    write_polygon_set(&filtered, output)?;
    cache::record_params(output, &params.shape);

    Ok(StageStatus::Completed)
}

/// Medial-axis width estimation + filter.
///
/// The buffered intermediate at `medial_path` is reused only when it
/// already carries the width field; the corrected widths are joined back
/// onto the unbuffered set by the explicit `poly_id` identity.
pub(crate) fn width_stage(
    input: &Path,
    medial_path: &Path,
    output: &Path,
    params: &ExtractParams,
    workspace: &Workspace,
) -> Result<StageStatus> {
    if cache::is_cached(output) {
        info!(path = %output.display(), "exists, skip removing based on medial axis");
        cache::warn_if_params_changed(output, &params.width);
        return Ok(StageStatus::Completed);
    }

    let cached = cache::is_cached(medial_path) && has_field(medial_path, E_MAX_DIS)?;
    if cached {
        info!(path = %medial_path.display(), "exists, skip width estimation");
        cache::warn_if_params_changed(medial_path, &params.width);
    } else {
        if cache::is_cached(medial_path) {
            info!(
                path = %medial_path.display(),
                field = E_MAX_DIS,
                "cached intermediate lacks width field, recomputing"
            );
        }
        estimate_widths(input, medial_path, params, workspace)?;
    }

    // Join the corrected widths onto the unbuffered polygons by identity
    let medial_set = read_polygon_set(medial_path)?;
    let raw = medial_set
        .column(E_MAX_DIS)
        .ok_or_else(|| Error::MissingField {
            field: E_MAX_DIS.to_string(),
            path: medial_path.display().to_string(),
        })?;
    let corrected = correct_widths(raw, params.width.buffer_size);

    let input_set = read_polygon_set(input)?;
    let widths = match medial_set.column(POLY_ID) {
        Some(ids) => {
            let by_id: HashMap<i64, f64> = ids
                .iter()
                .zip(corrected.iter())
                .map(|(&id, &w)| (id as i64, w))
                .collect();
            (0..input_set.len())
                .map(|i| {
                    by_id.get(&(i as i64)).copied().ok_or_else(|| {
                        Error::MissingField {
                            field: format!("{} = {}", POLY_ID, i),
                            path: medial_path.display().to_string(),
                        }
                    })
                })
                .collect::<Result<Vec<f64>>>()?
        }
        None => {
            // A foreign cache without identities: fall back to positional
            // correspondence, which the estimator contract guarantees
            warn!(
                path = %medial_path.display(),
                "no polygon identities in cached widths, using positional join"
            );
            if corrected.len() != input_set.len() {
                return Err(Error::Vector(format!(
                    "cached widths hold {} records for {} polygons",
                    corrected.len(),
                    input_set.len()
                )));
            }
            corrected
        }
    };

    let mut columns = BTreeMap::new();
    columns.insert(E_MAX_DIS.to_string(), widths);
    attach_attributes(input, &columns)?;

    let set = read_polygon_set(input)?;
    let filtered = remove_larger(&set, E_MAX_DIS, params.width.max_axis_width)?;
    if filtered.is_empty() {
        return Ok(StageStatus::Empty);
    }

    write_polygon_set(&filtered, output)?;
    cache::record_params(output, &params.width);

    Ok(StageStatus::Completed)
}

/// Buffer the candidates, persist the buffered set, run the estimator and
/// attach its statistics to the buffered file.
fn estimate_widths(
    input: &Path,
    medial_path: &Path,
    params: &ExtractParams,
    workspace: &Workspace,
) -> Result<()> {
    let set = read_polygon_set(input)?;
    info!(
        count = set.len(),
        buffer = params.width.buffer_size,
        "calculating polygon width based on medial axis"
    );

    let buffer_params = BufferParams {
        distance: params.width.buffer_size,
        ..BufferParams::default()
    };

    let buffered: Vec<Polygon<f64>> = set
        .geometries()
        .iter()
        .map(|geom| {
            let poly = largest_part(geom);
            buffer_polygon(&poly, &buffer_params)
        })
        .collect();

    let geoms = buffered
        .iter()
        .cloned()
        .map(Geometry::Polygon)
        .collect::<Vec<_>>();
    let mut buffered_set = PolygonSet::from_geometries(geoms, set.crs().cloned());
    buffered_set.attach_column(
        POLY_ID,
        (0..buffered.len()).map(|i| i as f64).collect(),
    )?;
    write_polygon_set(&buffered_set, medial_path)?;

    let estimator = RetreatDistance {
        save_medial_axis: true,
        artifact_dir: Some(workspace.work_dir.clone()),
        ..RetreatDistance::default()
    };
    let stats = estimator.estimate(&buffered, params.width.process_num)?;

    let mut columns = BTreeMap::new();
    columns.insert(
        "e_min_dis".to_string(),
        stats.iter().map(|s| s.min_dis).collect(),
    );
    columns.insert(
        E_MAX_DIS.to_string(),
        stats.iter().map(|s| s.max_dis).collect(),
    );
    columns.insert(
        "e_mean_dis".to_string(),
        stats.iter().map(|s| s.mean_dis).collect(),
    );
    columns.insert(
        "e_medi_dis".to_string(),
        stats.iter().map(|s| s.median_dis).collect(),
    );
    attach_attributes(medial_path, &columns)?;
    cache::record_params(medial_path, &params.width);

    cleanup_artifacts(&workspace.work_dir);
    Ok(())
}

/// The single polygon of a simple geometry, or the largest part of a
/// composite one (composites should not reach the width stage; the area
/// filter decomposes them).
fn largest_part(geom: &Geometry<f64>) -> Polygon<f64> {
    use geo::Area;

    decompose_multipart(geom)
        .into_iter()
        .max_by(|a, b| {
            a.unsigned_area()
                .partial_cmp(&b.unsigned_area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or_else(|| Polygon::new(geo_types::LineString::new(vec![]), vec![]))
}

/// Remove the estimator's scratch files. Failure is non-fatal.
fn cleanup_artifacts(work_dir: &Path) {
    let Ok(entries) = std::fs::read_dir(work_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(MEDIAL_AXIS_ARTIFACT_PREFIX) && name.ends_with(".txt") {
            if let Err(e) = std::fs::remove_file(entry.path()) {
                debug!(path = %entry.path().display(), error = %e, "could not remove scratch file");
            }
        }
    }
}
