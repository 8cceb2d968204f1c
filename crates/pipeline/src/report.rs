//! Batch outcome reporting
//!
//! Per-raster failures are values, not errors: the batch keeps going and
//! the reasons are collected for the final report and the failed-input
//! list file.

use headwall_core::Result;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Why one input raster produced no headwall polygons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The binary mask had no extractable connected component
    NoComponents,
    /// A filtering stage removed every candidate
    EmptyResult { stage: &'static str },
    /// The width computation (or another stage) errored out
    Computation { message: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoComponents => write!(f, "no connected components in mask"),
            FailureReason::EmptyResult { stage } => {
                write!(f, "no polygons remain after the {} filter", stage)
            }
            FailureReason::Computation { message } => write!(f, "computation failed: {}", message),
        }
    }
}

/// Outcome for one input raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterOutcome {
    /// Path to the final headwall polygon file
    Extracted(PathBuf),
    Failed(FailureReason),
}

impl RasterOutcome {
    pub fn is_extracted(&self) -> bool {
        matches!(self, RasterOutcome::Extracted(_))
    }
}

/// Outcomes for a whole batch, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    outcomes: Vec<(PathBuf, RasterOutcome)>,
}

impl BatchReport {
    pub fn push(&mut self, input: PathBuf, outcome: RasterOutcome) {
        self.outcomes.push((input, outcome));
    }

    pub fn outcomes(&self) -> &[(PathBuf, RasterOutcome)] {
        &self.outcomes
    }

    pub fn extracted_count(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_extracted()).count()
    }

    /// Inputs that failed end-to-end, in input order
    pub fn failed_inputs(&self) -> Vec<&Path> {
        self.outcomes
            .iter()
            .filter(|(_, o)| !o.is_extracted())
            .map(|(p, _)| p.as_path())
            .collect()
    }

    /// Write the failed-input list, one path per line (written even when
    /// empty, so a clean run leaves an empty marker).
    pub fn save_failed_list(&self, path: &Path) -> Result<()> {
        let mut text = String::new();
        for input in self.failed_inputs() {
            text.push_str(&input.to_string_lossy());
            text.push('\n');
        }
        fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_and_failed_list() {
        let mut report = BatchReport::default();
        report.push(
            PathBuf::from("a.tif"),
            RasterOutcome::Extracted(PathBuf::from("a_headwall.geojson")),
        );
        report.push(
            PathBuf::from("b.tif"),
            RasterOutcome::Failed(FailureReason::NoComponents),
        );
        report.push(
            PathBuf::from("c.tif"),
            RasterOutcome::Failed(FailureReason::EmptyResult { stage: "area" }),
        );

        assert_eq!(report.extracted_count(), 1);
        assert_eq!(report.failed_inputs(), vec![Path::new("b.tif"), Path::new("c.tif")]);

        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("failed.txt");
        report.save_failed_list(&list).unwrap();

        let text = std::fs::read_to_string(&list).unwrap();
        assert_eq!(text, "b.tif\nc.tif\n");
    }

    #[test]
    fn test_failure_reason_display() {
        let r = FailureReason::EmptyResult { stage: "area" };
        assert_eq!(r.to_string(), "no polygons remain after the area filter");
    }
}
