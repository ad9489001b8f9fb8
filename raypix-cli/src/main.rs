//! raypix CLI
//!
//! Cosmic-ray rejection and exposure combination for detector TIFF images.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{ArgAction, Parser, Subcommand};

use raypix_algorithms::{remove_cosmic_rays, ImageCombiner};
use raypix_core::DetectionParams;
use raypix_io::{
    combine_directory, parse_group_config, process_measurements, read_image, write_image,
    MeasurementConfig, PipelineEvent,
};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    RaypixIo(#[from] raypix_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] raypix_core::Error),

    #[error("{0}")]
    Usage(String),
}

/// Cosmic-ray rejection for diffraction detector images.
#[derive(Parser)]
#[command(name = "raypix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine every measurement of an input directory
    Combine {
        /// Directory holding the g1, g2, ... folders
        #[arg(required_unless_present = "config")]
        input: Option<PathBuf>,

        /// Directory receiving combined TIFFs
        #[arg(required_unless_present = "config")]
        output: Option<PathBuf>,

        /// JSON measurement configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// First folder index
        #[arg(long, default_value = "1", conflicts_with = "config")]
        start: usize,

        /// Last folder index a measurement may start at
        #[arg(long, default_value = "100", conflicts_with = "config")]
        end: usize,

        /// Output file name prefix
        #[arg(short, long, default_value = "", conflicts_with = "config")]
        prefix: String,

        /// Group layout as JSON, e.g. '[{"center": 2, "side": 2}]'
        #[arg(short, long, conflicts_with = "config")]
        groups: Option<String>,

        /// z-score threshold
        #[arg(long, default_value = "6.0", conflicts_with = "config")]
        sigma: f64,

        /// Neighborhood side length (odd)
        #[arg(long, default_value = "11", conflicts_with = "config")]
        window: usize,

        /// Detection rounds per image
        #[arg(long, default_value = "3", conflicts_with = "config")]
        iterations: usize,

        /// Pixels at or below this value are never flagged
        #[arg(long, default_value = "50.0", conflicts_with = "config")]
        min_intensity: f64,
    },

    /// Remove cosmic rays from a single image, writing flagged pixels as NaN
    RemoveCosmic {
        /// Input TIFF
        input: PathBuf,

        /// Output TIFF
        output: PathBuf,

        /// z-score threshold
        #[arg(long, default_value = "5.0")]
        sigma: f64,

        /// Neighborhood side length (odd)
        #[arg(long, default_value = "5")]
        window: usize,

        /// Detection rounds
        #[arg(long, default_value = "3")]
        iterations: usize,

        /// Pixels at or below this value are never flagged
        #[arg(long, default_value = "0.0")]
        min_intensity: f64,
    },

    /// Combine all exposures in one folder into a single TIFF
    CombineDir {
        /// Folder of TIFF exposures
        input: PathBuf,

        /// Output TIFF
        output: PathBuf,

        /// z-score threshold
        #[arg(long, default_value = "6.0")]
        sigma: f64,

        /// Neighborhood side length (odd)
        #[arg(long, default_value = "11")]
        window: usize,

        /// Detection rounds per image
        #[arg(long, default_value = "3")]
        iterations: usize,

        /// Pixels at or below this value are never flagged
        #[arg(long, default_value = "50.0")]
        min_intensity: f64,

        /// Process exposures one at a time
        #[arg(long)]
        sequential: bool,
    },
}

fn detection(sigma: f64, window: usize, iterations: usize, min_intensity: f64) -> DetectionParams {
    DetectionParams::new()
        .with_sigma(sigma)
        .with_window_size(window)
        .with_iterations(iterations)
        .with_min_intensity(min_intensity)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn print_event(event: PipelineEvent) {
    match event {
        PipelineEvent::MeasurementStarted {
            measurement,
            start_index,
        } => {
            println!("Measurement {} (from g{})", measurement, start_index);
        }
        PipelineEvent::GroupsDiscovered { groups, .. } => {
            for group in groups {
                println!("  {}: {}", group.name, group.folders.join(", "));
            }
        }
        PipelineEvent::FolderCombined {
            folder,
            images,
            reports,
            fallback_pixels,
            ..
        } => {
            let flagged: usize = reports.iter().map(|r| r.total()).sum();
            println!(
                "  {}: {} images, {} cosmic-ray pixels, {} kept original",
                folder, images, flagged, fallback_pixels
            );
        }
        PipelineEvent::FolderSkipped { folder, reason, .. } => {
            eprintln!("  {}: skipped ({})", folder, reason);
        }
        PipelineEvent::ImageWritten { path, .. } => {
            println!("  wrote {}", path.display());
        }
        PipelineEvent::Cancelled => println!("Cancelled"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Combine {
            input,
            output,
            config,
            start,
            end,
            prefix,
            groups,
            sigma,
            window,
            iterations,
            min_intensity,
        } => {
            let mut measurement = if let Some(path) = config {
                MeasurementConfig::from_file(path)?
            } else {
                let (Some(input), Some(output)) = (input.clone(), output.clone()) else {
                    return Err(CliError::Usage(
                        "input and output directories are required".to_string(),
                    ));
                };
                let mut measurement = MeasurementConfig::new(input, output)
                    .with_range(start, end)
                    .with_prefix(prefix)
                    .with_detection(detection(sigma, window, iterations, min_intensity));
                if let Some(json) = groups {
                    measurement = measurement.with_groups(parse_group_config(&json)?);
                }
                measurement
            };
            if let Some(input) = input {
                measurement.input = input;
            }
            if let Some(output) = output {
                measurement.output = output;
            }

            let timer = Instant::now();
            let summary = process_measurements(&measurement, &mut print_event, None)?;
            println!(
                "Processed {} measurement(s), wrote {} file(s), skipped {} folder(s) in {:.2}s",
                summary.measurements,
                summary.written.len(),
                summary.skipped_folders.len(),
                timer.elapsed().as_secs_f64()
            );
        }

        Commands::RemoveCosmic {
            input,
            output,
            sigma,
            window,
            iterations,
            min_intensity,
        } => {
            let params = detection(sigma, window, iterations, min_intensity);
            let image = read_image(&input)?;
            let removal = remove_cosmic_rays(image.view(), &params)?;
            write_image(&output, &removal.image)?;
            println!("Found cosmic rays: {}", removal.report);
            println!("Flagged {} pixels", removal.flagged());
            println!("Wrote {}", output.display());
        }

        Commands::CombineDir {
            input,
            output,
            sigma,
            window,
            iterations,
            min_intensity,
            sequential,
        } => {
            let combiner = ImageCombiner::new(detection(sigma, window, iterations, min_intensity))?
                .with_parallel(!sequential);
            let result = combine_directory(&input, &combiner)?;
            write_image(&output, &result.combination.image)?;
            for (file, report) in result.files.iter().zip(&result.combination.reports) {
                println!("{}: {}", file.display(), report);
            }
            println!(
                "Combined {} images, {} kept original",
                result.files.len(),
                result.combination.fallbacks()
            );
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}
