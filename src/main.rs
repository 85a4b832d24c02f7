//! Calibration data loader CLI: reads, normalizes and inspects calibration batches.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use calibration_rs::calibration::{store, CalibrationConfig, CalibrationLoader, DegeneratePolicy};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// `.npz` archive, one array per input
    Npz,
    /// `<name>.bin` little-endian f32 buffers in a directory
    Raw,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Degenerate {
    Zero,
    Skip,
    Error,
}

impl From<Degenerate> for DegeneratePolicy {
    fn from(value: Degenerate) -> Self {
        match value {
            Degenerate::Zero => DegeneratePolicy::Zero,
            Degenerate::Skip => DegeneratePolicy::Skip,
            Degenerate::Error => DegeneratePolicy::Error,
        }
    }
}

/// Load calibration batches: per-image intensity normalized to 255, replicated to 3 channels.
#[derive(Parser, Debug)]
#[command(name = "calibration-rs")]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backing .npz or .npy file.
    #[arg(short, long, value_name = "PATH")]
    data_file: Option<PathBuf>,

    /// Array name inside the archive.
    #[arg(short, long, value_name = "NAME")]
    field: Option<String>,

    /// Key of the returned sample.
    #[arg(long, value_name = "NAME")]
    input_name: Option<String>,

    /// How images with zero total intensity are handled.
    #[arg(long, value_enum)]
    degenerate: Option<Degenerate>,

    /// Number of calibration iterations to run.
    #[arg(short = 'n', long, default_value = "1", value_name = "INT")]
    iterations: usize,

    /// Export the last sample to this path.
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Export format.
    #[arg(long, value_enum, default_value = "npz")]
    format: OutputFormat,

    /// Print the arrays stored in the data file and exit.
    #[arg(long)]
    list_fields: bool,

    /// Print statistics of the last sample as JSON.
    #[arg(long)]
    json: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("calibration_rs={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn build_config(args: &Args) -> Result<CalibrationConfig> {
    let mut config = match &args.config {
        Some(path) => CalibrationConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CalibrationConfig::default(),
    };

    if let Some(data_file) = &args.data_file {
        config = config.with_data_file(data_file.clone());
    }
    if let Some(field) = &args.field {
        config = config.with_field(field.clone());
    }
    if let Some(input_name) = &args.input_name {
        config = config.with_input_name(input_name.clone());
    }
    if let Some(degenerate) = args.degenerate {
        config = config.with_degenerate(degenerate.into());
    }

    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;

    if args.list_fields {
        let fields = store::list_fields(&config.data_file)
            .with_context(|| format!("Failed to list {}", config.data_file.display()))?;
        for field in fields {
            println!("{field}");
        }
        return Ok(());
    }

    if args.iterations == 0 {
        anyhow::bail!("--iterations must be at least 1");
    }

    let loader = CalibrationLoader::new(config).context("Invalid configuration")?;

    let mut last = None;
    for iteration in 0..args.iterations {
        let sample = loader
            .read_image(iteration)
            .with_context(|| format!("Failed to load calibration data for iteration {iteration}"))?;

        for (name, stats) in sample.stats() {
            tracing::info!(
                iteration,
                "{name}: shape {:?}, range [{}, {}], mean {:.4}",
                stats.shape,
                stats.min,
                stats.max,
                stats.mean
            );
        }
        last = Some(sample);
    }

    let Some(sample) = last else {
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sample.stats())?);
    }

    if let Some(output) = &args.output {
        match args.format {
            OutputFormat::Npz => sample
                .write_npz(output)
                .with_context(|| format!("Failed to write {}", output.display()))?,
            OutputFormat::Raw => {
                let written = sample
                    .write_raw(output)
                    .with_context(|| format!("Failed to write {}", output.display()))?;
                for path in written {
                    tracing::info!("wrote {}", path.display());
                }
            }
        }
        println!(
            "Wrote calibration sample ({} images) to {}",
            sample.batch_size(),
            output.display()
        );
    }

    Ok(())
}
