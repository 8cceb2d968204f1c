//! Stage result caching
//!
//! A stage output file's existence is what gates recomputation — content
//! is not validated, matching the resume behavior of the original
//! workflow. Because a bare existence check cannot tell whether a cached
//! file was produced under the *current* parameters, every computed stage
//! also records a parameter sidecar (`<output>.params.json`); when a stage
//! is skipped and the sidecar disagrees, the cache warns with both sets so
//! stale reuse is visible. It still reuses the file.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Sidecar path for a stage output
fn sidecar_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".params.json");
    output.with_file_name(name)
}

/// Whether the stage output already exists (existence = validity).
pub fn is_cached(output: &Path) -> bool {
    output.is_file()
}

/// Record the parameters a stage output was computed under.
///
/// Sidecar failures are non-fatal: the sidecar is diagnostics, not a
/// correctness requirement.
pub fn record_params<P: Serialize>(output: &Path, params: &P) {
    let path = sidecar_path(output);
    match serde_json::to_string_pretty(params) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&path, json) {
                debug!(path = %path.display(), error = %e, "could not write params sidecar");
            }
        }
        Err(e) => debug!(error = %e, "could not serialize params sidecar"),
    }
}

/// Warn when a cached stage output was computed under different parameters.
pub fn warn_if_params_changed<P: Serialize>(output: &Path, params: &P) {
    let path = sidecar_path(output);
    let Ok(recorded) = std::fs::read_to_string(&path) else {
        return;
    };
    let Ok(current) = serde_json::to_string_pretty(params) else {
        return;
    };
    if recorded.trim() != current.trim() {
        warn!(
            output = %output.display(),
            recorded = %recorded.trim(),
            current = %current.trim(),
            "reusing cached stage output computed under different parameters"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct P {
        threshold: f64,
    }

    #[test]
    fn test_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("stage.geojson");
        assert!(!is_cached(&out));
        std::fs::write(&out, "{}").unwrap();
        assert!(is_cached(&out));
    }

    #[test]
    fn test_sidecar_written_next_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("stage.geojson");
        record_params(&out, &P { threshold: 20.0 });
        assert!(dir.path().join("stage.geojson.params.json").is_file());
    }
}
