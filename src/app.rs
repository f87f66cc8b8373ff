//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the requested pipeline
//! - prints reports/plots and writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{AugmentArgs, Command, GridArgs, ImportArgs, LookupArgs, StreamArgs};
use crate::data::add_ratio_columns;
use crate::domain::GeometryLayout;
use crate::error::AppError;
use crate::grid::GridOptions;

pub mod pipeline;

use pipeline::TargetSource;

/// Entry point for the `nspec` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; flags and the environment still apply.
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::GenerateGrid(args) => handle_grid(args),
        Command::StreamCandidates(args) => handle_stream(args),
        Command::ImportDataset(args) => handle_import(args),
        Command::Lookup(args) => handle_lookup(args),
        Command::Augment(args) => handle_augment(args),
    }
}

/// Logs go to stderr so reports on stdout stay pipeable. `RUST_LOG` overrides
/// the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Ignore a second init (tests may have installed a subscriber already).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn handle_grid(args: GridArgs) -> Result<(), AppError> {
    let bounds = args.bounds()?;
    let spacing = args.spacing()?;
    let options = GridOptions {
        mode: args.mode(),
        cancel: None,
    };
    let run = pipeline::run_grid(&bounds, &spacing, &args.out, &options, !args.no_manifest)?;

    println!("{}", crate::report::format_grid_summary(&run.summary));
    if let Some(path) = run.manifest {
        println!("Manifest: {}", path.display());
    }
    Ok(())
}

fn handle_stream(args: StreamArgs) -> Result<(), AppError> {
    let run = pipeline::run_stream(&args.inputs, args.layout(), args.batch_size)?;
    println!(
        "{}",
        crate::report::format_stream_summary(&run.files, run.batches, run.batch_size, run.records_read)
    );
    Ok(())
}

fn handle_import(args: ImportArgs) -> Result<(), AppError> {
    let run = pipeline::run_import(
        &args.data_dir,
        args.x_range,
        args.y_range,
        args.options(),
        args.decimation(),
        &args.split_config(),
    )?;
    println!(
        "{}",
        crate::report::format_import_summary(&run.data, Some(&run.splits))
    );
    Ok(())
}

fn handle_lookup(args: LookupArgs) -> Result<(), AppError> {
    args.validate_target_source()?;
    let source = match &args.target {
        Some(path) => TargetSource::File(path.clone()),
        None => TargetSource::Points(args.points.clone()),
    };
    let target = source.load(args.spectrum_len)?;

    let run = pipeline::run_lookup(&target, &args.library, args.features.as_deref(), &args.config())?;
    let geometries = run.geometries.as_deref();

    println!("{}", crate::report::format_lookup(&run.result, geometries));
    if args.plot {
        let plot = crate::plot::render_lookup_plot(&run.result, args.width, args.height);
        println!("{plot}");
    }

    if let Some(path) = &args.export {
        crate::io::export::write_candidates_csv(path, &run.result.candidates, geometries)?;
        println!("Exported {} candidate(s) to {}", run.result.candidates.len(), path.display());
    }
    Ok(())
}

fn handle_augment(args: AugmentArgs) -> Result<(), AppError> {
    let layout = GeometryLayout { offset: args.offset };
    let files = add_ratio_columns(&args.input_dir, &args.output_dir, layout)?;
    println!("{}", crate::report::format_augment_summary(&files));
    Ok(())
}
