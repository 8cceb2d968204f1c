//! # Headwall Pipeline
//!
//! Sequences the extraction stages for each input slope raster:
//!
//! ```text
//! slope.tif → binary mask → raw polygons → area filter → shape filter
//!           → medial-axis width filter → final headwall polygon set
//! ```
//!
//! Every stage persists its output before the next stage reads it; the
//! persisted file is both the inter-stage channel and the resume cache.
//! A stage whose output file already exists is skipped. Per-raster
//! failures (a filter emptied the candidate set) are signals collected
//! into a batch report, never process aborts.

pub mod cache;
pub mod config;
pub mod paths;
pub mod report;
pub mod runner;
mod stages;

pub use config::{ExtractParams, Workspace};
pub use paths::StagePaths;
pub use report::{BatchReport, FailureReason, RasterOutcome};
pub use runner::{extract_headwall_from_slope, gather_inputs, run_batch, FAILED_LIST_FILENAME};
