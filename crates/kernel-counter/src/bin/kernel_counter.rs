//! kernel-counter CLI: count bright and non-bright kernels in a directory of
//! ear scans and write one TSV row per image.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use kernel_counter::batch::count_directory;
use kernel_counter::io::{write_tsv, BatchReport, KernelCountConfig};
use kernel_counter::CountError;
use log::{error, info, LevelFilter};

#[derive(Parser, Debug)]
#[command(name = "kernel-counter")]
#[command(about = "Given maize ear scans, count the kernels and split them by fluorescence")]
#[command(version)]
struct Cli {
    /// Directory containing the images to process.
    #[arg(short = 'i', long = "input-directory-path")]
    input_directory_path: Option<PathBuf>,

    /// Fraction of the width cropped from each side, in [0, 0.5].
    #[arg(short = 'p', long = "image-crop-percentage")]
    image_crop_percentage: Option<f64>,

    /// Height of the h-dome transform (on 0..1 intensities).
    #[arg(short = 'd', long = "h-dome-value")]
    h_dome_value: Option<f32>,

    /// Elevation below which pixels seed the background.
    #[arg(long = "watershed-low", visible_alias = "wl")]
    watershed_low: Option<u8>,

    /// Elevation above which pixels seed kernels.
    #[arg(long = "watershed-high", visible_alias = "wh")]
    watershed_high: Option<u8>,

    /// File extension of input images.
    #[arg(long)]
    extension: Option<String>,

    /// TSV output path (default: sk_kernel_counter_batch_output.tsv).
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// JSON config file; command-line flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON report with per-kernel records.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level for the stderr logger.
    #[arg(
        long,
        default_value = "info",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,

    /// Emit logs as JSON lines through `tracing`.
    #[cfg(feature = "tracing")]
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply_to(&self, cfg: &mut KernelCountConfig) {
        if let Some(dir) = &self.input_directory_path {
            cfg.input_directory = Some(dir.clone());
        }
        if let Some(ext) = &self.extension {
            cfg.extension = ext.clone();
        }
        if let Some(out) = &self.output {
            cfg.output_path = Some(out.to_string_lossy().into_owned());
        }
        if let Some(report) = &self.report {
            cfg.report_path = Some(report.to_string_lossy().into_owned());
        }
        if self.image_crop_percentage.is_some() {
            cfg.crop_percentage = self.image_crop_percentage;
        }
        if self.h_dome_value.is_some() {
            cfg.h_dome_value = self.h_dome_value;
        }
        if self.watershed_low.is_some() {
            cfg.watershed_low = self.watershed_low;
        }
        if self.watershed_high.is_some() {
            cfg.watershed_high = self.watershed_high;
        }
    }
}

fn init_logging(cli: &Cli) {
    #[cfg(feature = "tracing")]
    {
        if cli.json_logs {
            kernel_counter::core::init_tracing(true);
            return;
        }
    }
    let level = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    let _ = kernel_counter::core::init_with_level(level);
}

fn run(cli: Cli) -> Result<(), CountError> {
    let mut cfg = match &cli.config {
        Some(path) => KernelCountConfig::load_json(path)?,
        None => KernelCountConfig::default(),
    };
    cli.apply_to(&mut cfg);

    let params = cfg.build_params()?;
    let input_dir = cfg
        .input_directory
        .clone()
        .ok_or(CountError::MissingInputDirectory)?;

    let outcome = count_directory(&input_dir, &cfg.extension, &params, |path: &Path| {
        println!("{} processed", path.display());
    })?;

    let output = cfg.output_path();
    write_tsv(&output, &outcome.counts)?;
    info!(
        "wrote {} rows to {}",
        outcome.counts.len(),
        output.display()
    );

    for f in &outcome.failures {
        error!("{}: {}", f.path.display(), f.error);
    }
    let failed = outcome.failures.len();
    let total = outcome.total();

    if let Some(report_path) = cfg.report_path() {
        let report = BatchReport {
            input_directory: input_dir,
            params,
            images: outcome.counts,
            failures: outcome.failures,
        };
        report.write_json(&report_path)?;
        info!("wrote report to {}", report_path.display());
    }

    if failed > 0 {
        return Err(CountError::ImagesFailed { failed, total });
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
