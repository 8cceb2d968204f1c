//! Stage output path derivation
//!
//! Every intermediate is named deterministically from the input raster by
//! appending a stage tag before the extension, so a resumed run finds the
//! same files:
//!
//! ```text
//! slope.tif → slope_bin.tif → slope_bin.geojson → slope_bin_rmArea.geojson
//!           → slope_bin_rmShape.geojson (+ _medialAxis) →
//!           slope_bin_rmMedialAxis.geojson → <save_dir>/slope_headwall.geojson
//! ```

use crate::config::Workspace;
use std::path::{Path, PathBuf};

/// Insert a tag between a file's stem and extension:
/// `slope.tif` + `bin` → `slope_bin.tif`.
pub fn add_name_tail(path: &Path, tail: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, tail, ext.to_string_lossy()),
        None => format!("{}_{}", stem, tail),
    };
    path.with_file_name(name)
}

/// The full tuple of per-raster stage paths.
#[derive(Debug, Clone)]
pub struct StagePaths {
    /// Binary slope mask raster
    pub slope_bin: PathBuf,
    /// Vectorized mask polygons
    pub mask_polygons: PathBuf,
    /// After the area filter
    pub rm_area: PathBuf,
    /// After the shape filter
    pub rm_shape: PathBuf,
    /// Buffered set carrying the width estimates
    pub medial_axis: PathBuf,
    /// After the width filter
    pub rm_medial_axis: PathBuf,
    /// Final copy in the save directory
    pub headwall: PathBuf,
}

impl StagePaths {
    /// Derive all stage paths for one input raster.
    pub fn for_input(slope_tif: &Path, workspace: &Workspace) -> Self {
        let file_name = |p: &Path| -> PathBuf {
            workspace.work_dir.join(p.file_name().unwrap_or_default())
        };

        let slope_bin = file_name(&add_name_tail(slope_tif, "bin"));
        let mask_polygons = slope_bin.with_extension("geojson");
        let rm_area = add_name_tail(&mask_polygons, "rmArea");
        let rm_shape = add_name_tail(&mask_polygons, "rmShape");
        let medial_axis = add_name_tail(&rm_shape, "medialAxis");
        let rm_medial_axis = add_name_tail(&mask_polygons, "rmMedialAxis");

        let headwall_name = add_name_tail(slope_tif, "headwall").with_extension("geojson");
        let headwall = workspace
            .save_dir
            .join(headwall_name.file_name().unwrap_or_default());

        Self {
            slope_bin,
            mask_polygons,
            rm_area,
            rm_shape,
            medial_axis,
            rm_medial_axis,
            headwall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_name_tail() {
        assert_eq!(
            add_name_tail(Path::new("/data/slope.tif"), "bin"),
            PathBuf::from("/data/slope_bin.tif")
        );
        assert_eq!(
            add_name_tail(Path::new("slope_bin.geojson"), "rmArea"),
            PathBuf::from("slope_bin_rmArea.geojson")
        );
        assert_eq!(
            add_name_tail(Path::new("noext"), "bin"),
            PathBuf::from("noext_bin")
        );
    }

    #[test]
    fn test_stage_paths() {
        let ws = Workspace {
            work_dir: PathBuf::from("/tmp/work"),
            save_dir: PathBuf::from("/tmp/save"),
        };
        let paths = StagePaths::for_input(Path::new("/data/tiles/slope.tif"), &ws);

        assert_eq!(paths.slope_bin, PathBuf::from("/tmp/work/slope_bin.tif"));
        assert_eq!(
            paths.mask_polygons,
            PathBuf::from("/tmp/work/slope_bin.geojson")
        );
        assert_eq!(
            paths.rm_area,
            PathBuf::from("/tmp/work/slope_bin_rmArea.geojson")
        );
        assert_eq!(
            paths.rm_shape,
            PathBuf::from("/tmp/work/slope_bin_rmShape.geojson")
        );
        assert_eq!(
            paths.medial_axis,
            PathBuf::from("/tmp/work/slope_bin_rmShape_medialAxis.geojson")
        );
        assert_eq!(
            paths.rm_medial_axis,
            PathBuf::from("/tmp/work/slope_bin_rmMedialAxis.geojson")
        );
        assert_eq!(
            paths.headwall,
            PathBuf::from("/tmp/save/slope_headwall.geojson")
        );
    }
}
