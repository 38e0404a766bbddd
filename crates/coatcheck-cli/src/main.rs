//! coatcheck: grade photographs of conformal-coated circuit boards.
//!
//! Runs the inspection pipeline on each image given on the command line and
//! prints coverage, void ratio, bubble count, crack density, thickness
//! uniformity and the final verdict. Optionally writes the annotated
//! overlay and the intermediate masks, and per-stage timing diagnostics.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin coatcheck -- [OPTIONS] <IMAGES>...
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use coatcheck_pipeline::diagnostics::{Clock, PipelineDiagnostics, inspect_with_diagnostics};
use coatcheck_pipeline::{InspectionConfig, InspectionError, InspectionReport, StagedInspection};
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Automated quality inspection of conformal-coated PCBs.
///
/// Each image is resized to the working resolution, segmented into coated
/// and bare regions, and graded by the selected decision scheme.
#[derive(Parser)]
#[command(name = "coatcheck", version)]
struct Cli {
    /// Board images (PNG, JPEG, BMP, WebP).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Imaging setup the parameters are tuned for.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_PROFILE)]
    profile: ProfileArg,

    /// Decision scheme to apply (e.g. `ipc`, `basic`).
    ///
    /// Overrides the scheme chosen by the profile or `--config-json`.
    #[arg(long)]
    scheme: Option<String>,

    /// Full inspection config as a JSON string.
    ///
    /// When provided, `--profile` is ignored. Missing fields take the
    /// UV-fluorescence defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Print one JSON object per image instead of the text report.
    #[arg(long)]
    json: bool,

    /// Write `<stem>-overlay.png` and the coating, void and crack masks
    /// into this directory.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Include per-stage timing diagnostics.
    #[arg(long)]
    diagnostics: bool,

    /// Log every pipeline stage.
    #[arg(short, long)]
    verbose: bool,
}

/// Profile selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    /// UV light, yellow-green fluorescent coating.
    UvFluorescence,
    /// White light, brightness contrast only.
    ValueContrast,
}

impl From<ProfileArg> for coatcheck_pipeline::Profile {
    fn from(p: ProfileArg) -> Self {
        match p {
            ProfileArg::UvFluorescence => Self::UvFluorescence,
            ProfileArg::ValueContrast => Self::ValueContrast,
        }
    }
}

const fn profile_arg(p: coatcheck_pipeline::Profile) -> ProfileArg {
    match p {
        coatcheck_pipeline::Profile::UvFluorescence => ProfileArg::UvFluorescence,
        coatcheck_pipeline::Profile::ValueContrast => ProfileArg::ValueContrast,
    }
}

/// Must match `Profile::default()`; checked in tests.
const CLI_DEFAULT_PROFILE: ProfileArg = profile_arg(coatcheck_pipeline::Profile::UvFluorescence);

/// Build an [`InspectionConfig`] from CLI arguments.
fn config_from_cli(cli: &Cli) -> Result<InspectionConfig, String> {
    let mut config = match cli.config_json {
        Some(ref json) => serde_json::from_str(json)
            .map_err(|e| format!("Error parsing --config-json: {e}"))?,
        None => InspectionConfig::for_profile(cli.profile.into()),
    };
    if let Some(ref scheme) = cli.scheme {
        config.decision_scheme.clone_from(scheme);
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// JSON line emitted per image.
#[derive(Serialize)]
struct ImageOutcome<'a> {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a InspectionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a InspectionError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<&'a PipelineDiagnostics>,
}

/// Failure to produce a verdict for one image.
enum Failure {
    Read(std::io::Error),
    Inspect(InspectionError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    debug!(?config, "configuration");

    if let Some(ref dir) = cli.overlay_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("Error creating {}: {e}", dir.display());
        return ExitCode::FAILURE;
    }

    let mut failures = 0usize;
    for path in &cli.images {
        match inspect_path(path, &config) {
            Ok((staged, diagnostics)) => {
                info!(
                    path = %path.display(),
                    grade = %staged.report.decision.grade,
                    "inspected"
                );
                if !emit_success(&cli, path, &staged, &diagnostics) {
                    failures += 1;
                }
            }
            Err(Failure::Read(e)) => {
                failures += 1;
                eprintln!("Error reading {}: {e}", path.display());
            }
            Err(Failure::Inspect(e)) => {
                failures += 1;
                error!(path = %path.display(), error = %e, "inspection failed");
                if cli.json {
                    print_json(&ImageOutcome {
                        path: path.display().to_string(),
                        report: None,
                        error: Some(&e),
                        diagnostics: None,
                    });
                } else {
                    eprintln!("{}: {e}", path.display());
                }
            }
        }
    }

    if failures > 0 {
        eprintln!("{failures} of {} image(s) failed", cli.images.len());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn inspect_path(
    path: &Path,
    config: &InspectionConfig,
) -> Result<(StagedInspection, PipelineDiagnostics), Failure> {
    let bytes = std::fs::read(path).map_err(Failure::Read)?;
    inspect_with_diagnostics(&bytes, config, &StdClock).map_err(Failure::Inspect)
}

/// Print the result of one image and write its rasters. Returns `false`
/// if any output could not be written.
fn emit_success(
    cli: &Cli,
    path: &Path,
    staged: &StagedInspection,
    diagnostics: &PipelineDiagnostics,
) -> bool {
    if cli.json {
        print_json(&ImageOutcome {
            path: path.display().to_string(),
            report: Some(&staged.report),
            error: None,
            diagnostics: cli.diagnostics.then_some(diagnostics),
        });
    } else {
        println!("== {} ==", path.display());
        println!("{}", format_report(&staged.report));
        if cli.diagnostics {
            println!();
            println!("{}", diagnostics.report());
        }
        println!();
    }

    cli.overlay_dir
        .as_deref()
        .is_none_or(|dir| write_rasters(dir, path, staged))
}

fn print_json(outcome: &ImageOutcome<'_>) {
    match serde_json::to_string(outcome) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing result for {}: {e}", outcome.path),
    }
}

/// Text report in the console layout operators are used to.
fn format_report(report: &InspectionReport) -> String {
    let m = &report.metrics;
    let thickness = m
        .thickness_std
        .map_or_else(|| "n/a".to_owned(), |s| format!("{s:.2}"));
    [
        format!("Coverage (%): {:.2}", m.coverage_pct),
        format!("Void ratio (%): {:.2}", m.void_ratio_pct),
        format!("Bubbles: {}", m.bubble_count),
        format!("Avg bubble confidence: {:.2}", m.avg_bubble_confidence),
        format!("Crack density: {:.4}", m.crack_density),
        format!("Thickness non-uniformity (σ): {thickness}"),
        format!("Final decision: {}", report.decision.label),
    ]
    .join("\n")
}

/// Output file for one raster of `source`.
fn raster_path(dir: &Path, source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    dir.join(format!("{stem}-{suffix}.png"))
}

fn write_rasters(dir: &Path, source: &Path, staged: &StagedInspection) -> bool {
    let overlay = raster_path(dir, source, "overlay");
    let coating = raster_path(dir, source, "coating");
    let void = raster_path(dir, source, "void");
    let cracks = raster_path(dir, source, "cracks");
    let results = [
        (&overlay, staged.overlay.save(&overlay)),
        (&coating, staged.coating_mask.save(&coating)),
        (&void, staged.void_mask.save(&void)),
        (&cracks, staged.crack_mask.save(&cracks)),
    ];

    let mut ok = true;
    for (out, result) in results {
        match result {
            Ok(()) => debug!(path = %out.display(), "wrote raster"),
            Err(e) => {
                ok = false;
                eprintln!("Error writing {}: {e}", out.display());
            }
        }
    }
    ok
}
