//! Per-raster orchestration and the batch loop
//!
//! One raster runs the fixed stage order; a stage's failure signal
//! short-circuits the rest of that raster. The batch is sequential and
//! never aborts on a per-raster failure — errors become `Computation`
//! failures in the report and processing moves to the next input.

use crate::config::{ExtractParams, Workspace};
use crate::paths::StagePaths;
use crate::report::{BatchReport, FailureReason, RasterOutcome};
use crate::stages::{self, StageStatus};
use headwall_core::vector::copy_vector_file;
use headwall_core::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the failed-input list written after a batch
pub const FAILED_LIST_FILENAME: &str = "extract_headwall_failed_tifs.txt";

/// Run the full extraction for one slope raster.
///
/// Returns the final headwall file path on success, or the failure reason
/// when a stage empties the candidate set. Hard errors (I/O, malformed
/// files) propagate as `Err` and are mapped to failures by the batch loop.
pub fn extract_headwall_from_slope(
    idx: usize,
    total: usize,
    slope_tif: &Path,
    workspace: &Workspace,
    params: &ExtractParams,
) -> Result<RasterOutcome> {
    let paths = StagePaths::for_input(slope_tif, workspace);

    if paths.headwall.is_file() {
        info!(path = %paths.headwall.display(), "exists, skip");
        return Ok(RasterOutcome::Extracted(paths.headwall));
    }

    info!(
        "({}/{}) extracting headwall from {}",
        idx + 1,
        total,
        slope_tif.display()
    );

    let crs = stages::mask_stage(slope_tif, &paths.slope_bin, params)?;

    if stages::vectorize_stage(&paths.slope_bin, &paths.mask_polygons, crs, params)?
        == StageStatus::Empty
    {
        return Ok(RasterOutcome::Failed(FailureReason::NoComponents));
    }

    if stages::area_stage(&paths.mask_polygons, &paths.rm_area, params)? == StageStatus::Empty {
        return Ok(RasterOutcome::Failed(FailureReason::EmptyResult { stage: "area" }));
    }

    if stages::shape_stage(&paths.rm_area, &paths.rm_shape, params)? == StageStatus::Empty {
        return Ok(RasterOutcome::Failed(FailureReason::EmptyResult { stage: "shape" }));
    }

    if stages::width_stage(
        &paths.rm_shape,
        &paths.medial_axis,
        &paths.rm_medial_axis,
        params,
        workspace,
    )? == StageStatus::Empty
    {
        return Ok(RasterOutcome::Failed(FailureReason::EmptyResult {
            stage: "medial-axis width",
        }));
    }

    copy_vector_file(&paths.rm_medial_axis, &paths.headwall)?;

    Ok(RasterOutcome::Extracted(paths.headwall))
}

/// Run a batch of slope rasters sequentially, collecting every outcome.
pub fn run_batch(
    inputs: &[PathBuf],
    workspace: &Workspace,
    params: &ExtractParams,
) -> BatchReport {
    let mut report = BatchReport::default();

    for (idx, input) in inputs.iter().enumerate() {
        let outcome = match extract_headwall_from_slope(idx, inputs.len(), input, workspace, params)
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(input = %input.display(), error = %e, "extraction failed");
                RasterOutcome::Failed(FailureReason::Computation {
                    message: e.to_string(),
                })
            }
        };
        report.push(input.clone(), outcome);
    }

    report
}

/// Resolve the CLI's positional argument into the list of slope rasters:
/// a `.txt` list of paths, a directory recursively globbed for `.tif`, or
/// a single raster path.
pub fn gather_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.extension().is_some_and(|e| e.eq_ignore_ascii_case("txt")) {
        let text = fs::read_to_string(input)?;
        return Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect());
    }

    if input.is_dir() {
        let mut tifs = Vec::new();
        collect_tifs(input, &mut tifs)?;
        tifs.sort();
        return Ok(tifs);
    }

    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    Err(Error::Other(format!(
        "input {} is neither a file, a directory, nor a .txt list",
        input.display()
    )))
}

fn collect_tifs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_tifs(&path, out)?;
        } else if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("tif")) {
            out.push(path);
        }
    }
    Ok(())
}
