//! chromalift CLI - colorize and restore photographs.

use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chromalift::config::Accelerator;
use chromalift::{Config, ErrorKind, Operation, Processor, Task};

/// Colorize grayscale photographs and restore faces.
#[derive(Parser, Debug)]
#[command(name = "chromalift")]
#[command(version, about, long_about = None)]
struct Args {
    /// Operation to run: enhance, colorize or colorize-enhance.
    #[arg(value_name = "OPERATION", value_parser = parse_operation)]
    operation: Operation,

    /// Input image path (PNG, JPEG, BMP or TIFF).
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output image path (PNG, JPEG or BMP).
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// JSON configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Resolution the colorization network runs at.
    #[arg(long, value_name = "INT")]
    input_size: Option<u32>,

    /// Execution provider for the models.
    #[arg(long, value_enum, value_name = "DEVICE")]
    accelerator: Option<Device>,

    /// Output JPEG quality (1-100).
    #[arg(short, long, value_name = "INT")]
    quality: Option<u8>,

    /// Give up after this many seconds, stopping at the next stage boundary.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Device {
    Auto,
    Cpu,
    Cuda,
}

impl From<Device> for Accelerator {
    fn from(device: Device) -> Self {
        match device {
            Device::Auto => Self::Auto,
            Device::Cpu => Self::Cpu,
            Device::Cuda => Self::Cuda,
        }
    }
}

fn parse_operation(s: &str) -> std::result::Result<Operation, String> {
    s.parse().map_err(|err: chromalift::Error| err.to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("chromalift={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        let kind = err
            .downcast_ref::<chromalift::Error>()
            .map(chromalift::Error::kind);
        match kind {
            Some(ErrorKind::Initialization) => tracing::error!("Startup failed: {err:#}"),
            Some(ErrorKind::Input) => tracing::error!("Invalid input: {err:#}"),
            Some(ErrorKind::Inference) => tracing::error!("Processing failed: {err:#}"),
            None => tracing::error!("{err:#}"),
        }
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn build_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(size) = args.input_size {
        config.colorizer.input_size = size;
    }
    if let Some(device) = args.accelerator {
        config.accelerator = device.into();
    }
    if let Some(quality) = args.quality {
        config.output_quality = quality;
    }

    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;

    let mut processor = Processor::new(config).context("Failed to initialize processor")?;
    processor.ensure_available(args.operation)?;

    processor
        .load(&args.input)
        .with_context(|| format!("Failed to load {}", args.input.display()))?;

    let task = Task::spawn(processor, args.operation)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .expect("valid template"),
    );
    spinner.set_message(format!("Running {}", args.operation));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let deadline = args
        .timeout
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    while !task.is_finished() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            spinner.set_message("Cancelling after current stage");
            task.cancel();
        }
        thread::sleep(Duration::from_millis(50));
    }

    let done = task.join()?;
    spinner.finish_and_clear();
    done.outcome.context("Failed to process image")?;

    done.processor
        .save(&args.output)
        .with_context(|| format!("Failed to save {}", args.output.display()))?;

    println!(
        "Successfully processed {} -> {}",
        args.input.display(),
        args.output.display()
    );

    Ok(())
}
