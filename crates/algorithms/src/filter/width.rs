//! Medial-axis-width filtering support
//!
//! The width stage buffers candidates outward to regularize narrow,
//! irregular outlines, estimates each buffered polygon's maximum internal
//! width with the retreat-distance estimator, undoes the artificial
//! enlargement by subtracting twice the buffer radius, and removes
//! candidates that are still too wide. The helpers here are the pure
//! pieces; the file protocol lives in the pipeline crate.

use headwall_core::vector::PolygonSet;
use headwall_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Attribute name for the estimated maximum width
pub const E_MAX_DIS: &str = "e_max_dis";
/// Attribute name for the explicit polygon identity carried through buffering
pub const POLY_ID: &str = "poly_id";

/// Parameters for the width filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidthParams {
    /// Maximum acceptable medial-axis width
    pub max_axis_width: f64,
    /// Outward buffer radius applied before estimation (map units)
    pub buffer_size: f64,
    /// Worker count handed to the retreat-distance estimator
    pub process_num: usize,
}

impl Default for WidthParams {
    fn default() -> Self {
        Self {
            max_axis_width: 80.0,
            buffer_size: 10.0,
            process_num: 4,
        }
    }
}

/// Undo the buffering enlargement: each estimated width picked up one
/// buffer radius on both sides.
pub fn correct_widths(raw: &[f64], buffer_size: f64) -> Vec<f64> {
    raw.iter().map(|v| v - 2.0 * buffer_size).collect()
}

/// Remove polygons whose `field` value is strictly greater than `threshold`
/// (keep-if-not-greater semantics).
pub fn remove_larger(set: &PolygonSet, field: &str, threshold: f64) -> Result<PolygonSet> {
    let values = set.column(field).ok_or_else(|| Error::MissingField {
        field: field.to_string(),
        path: "<polygon set>".to_string(),
    })?;

    let keep: Vec<usize> = (0..set.len()).filter(|&i| values[i] <= threshold).collect();

    info!(
        field,
        threshold,
        removed = set.len() - keep.len(),
        remain = keep.len(),
        "removed polygons above threshold"
    );

    Ok(set.subset(&keep))
}
