//! Pipeline configuration
//!
//! All tunables travel in explicit values threaded through every stage
//! call; there is no process-global working directory.

use headwall_algorithms::filter::{AreaParams, ShapeParams, WidthParams};
use headwall_algorithms::mask::MaskParams;
use headwall_algorithms::vectorize::Connectivity;
use headwall_core::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Full parameter set for one extraction run.
///
/// Serialized next to each stage output so a resumed run can tell whether
/// a cached file was produced under the same parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractParams {
    pub mask: MaskParams,
    pub area: AreaParams,
    pub shape: ShapeParams,
    pub width: WidthParams,
    pub connectivity: Connectivity,
}

/// Working and output directories for a run.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Directory holding per-stage intermediates
    pub work_dir: PathBuf,
    /// Directory receiving the final headwall polygon files
    pub save_dir: PathBuf,
}

impl Workspace {
    /// Create both directories if needed.
    pub fn create(work_dir: impl AsRef<Path>, save_dir: impl AsRef<Path>) -> Result<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();
        let save_dir = save_dir.as_ref().to_path_buf();
        fs::create_dir_all(&work_dir)?;
        fs::create_dir_all(&save_dir)?;
        Ok(Self { work_dir, save_dir })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let save = dir.path().join("out/headwall_shp");

        let ws = Workspace::create(&work, &save).unwrap();
        assert!(ws.work_dir.is_dir());
        assert!(ws.save_dir.is_dir());
    }

    #[test]
    fn test_params_serialize_roundtrip() {
        let params = ExtractParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let back: ExtractParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mask.threshold, params.mask.threshold);
        assert_eq!(back.width.buffer_size, params.width.buffer_size);
    }
}
