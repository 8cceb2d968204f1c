//! headwall CLI - extract retrogressive thaw slump headwalls from slope rasters

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use headwall_algorithms::filter::{AreaParams, ShapeParams, WidthParams};
use headwall_algorithms::mask::MaskParams;
use headwall_pipeline::{
    extract_headwall_from_slope, gather_inputs, BatchReport, ExtractParams, RasterOutcome,
    Workspace, FAILED_LIST_FILENAME,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "headwall")]
#[command(
    author,
    version,
    about = "Extract retrogressive thaw slump headwalls from DEM-derived slope rasters",
    long_about = None
)]
struct Cli {
    /// Slope raster, a .txt list of raster paths, or a directory searched
    /// recursively for .tif files
    input: PathBuf,

    /// Number of worker processes for the width estimation
    #[arg(long, default_value_t = 4)]
    process_num: usize,

    /// The minimum slope (degrees)
    #[arg(short = 's', long, default_value_t = 20.0)]
    min_slope: f64,

    /// The minimum polygon area
    #[arg(long, default_value_t = 200.0)]
    min_area: f64,

    /// The maximum polygon area
    #[arg(long, default_value_t = 50000.0)]
    max_area: f64,

    /// The maximum width based on the medial axis
    #[arg(long, default_value_t = 80.0)]
    max_axis_width: f64,

    /// Max width or height (whichever is larger) of the minimum rotated rectangle
    #[arg(long, default_value_t = 600.0)]
    max_box_wh: f64,

    /// Working directory for per-stage intermediates
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Output directory for the headwall polygon files
    #[arg(long, default_value = "headwall_shp")]
    save_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn batch_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.green} {pos}/{len} {msg}")
            .unwrap(),
    );
    pb
}

fn build_params(cli: &Cli) -> ExtractParams {
    ExtractParams {
        mask: MaskParams {
            threshold: cli.min_slope,
            ..MaskParams::default()
        },
        area: AreaParams {
            min_area: cli.min_area,
            max_area: cli.max_area,
        },
        shape: ShapeParams {
            max_box_wh: cli.max_box_wh,
        },
        width: WidthParams {
            max_axis_width: cli.max_axis_width,
            process_num: cli.process_num,
            ..WidthParams::default()
        },
        connectivity: Default::default(),
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let start = Instant::now();

    let inputs = gather_inputs(&cli.input)
        .with_context(|| format!("Cannot resolve input {}", cli.input.display()))?;
    if inputs.is_empty() {
        anyhow::bail!("No slope rasters found under {}", cli.input.display());
    }
    info!("{} slope raster(s) to process", inputs.len());

    let workspace = Workspace::create(&cli.work_dir, &cli.save_dir)
        .context("Cannot create working directories")?;
    let params = build_params(&cli);

    let pb = batch_bar(inputs.len() as u64);
    let mut report = BatchReport::default();

    for (idx, input) in inputs.iter().enumerate() {
        pb.set_message(
            input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let outcome =
            match extract_headwall_from_slope(idx, inputs.len(), input, &workspace, &params) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(input = %input.display(), error = %e, "extraction failed");
                    RasterOutcome::Failed(headwall_pipeline::FailureReason::Computation {
                        message: e.to_string(),
                    })
                }
            };
        report.push(input.clone(), outcome);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let failed_list = workspace.save_dir.join(FAILED_LIST_FILENAME);
    report
        .save_failed_list(&failed_list)
        .context("Cannot write failed-input list")?;

    println!(
        "Extracted headwalls from {}/{} raster(s) into {}",
        report.extracted_count(),
        inputs.len(),
        workspace.save_dir.display()
    );
    for (input, outcome) in report.outcomes() {
        if let RasterOutcome::Failed(reason) = outcome {
            println!("  failed: {} ({})", input.display(), reason);
        }
    }
    if report.extracted_count() < inputs.len() {
        println!("Failed inputs listed in {}", failed_list.display());
    }
    println!("  Processing time: {:.2?}", start.elapsed());

    Ok(())
}
