use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Args;
use photomerge_core::frame::CaptureMetadata;
use photomerge_core::pipeline::run_dro;

use super::DroArg;
use crate::io::{load_config, load_frame, save_frame};
use crate::progress::BarReporter;
use crate::summary::{print_merge_result, print_merge_settings, MergeMode};

#[derive(Args)]
pub struct DroArgs {
    /// Input image
    pub file: PathBuf,

    /// Capture ISO
    #[arg(long)]
    pub iso: Option<u32>,

    /// Capture exposure time in nanoseconds
    #[arg(long = "exposure-ns")]
    pub exposure_ns: Option<u64>,

    /// Merge config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Local contrast strength (0-1), overriding the config
    #[arg(long)]
    pub alpha: Option<f32>,

    /// Brightening algorithm, overriding the config
    #[arg(long, value_enum)]
    pub algorithm: Option<DroArg>,

    /// Output file path
    #[arg(short, long, default_value = "dro.png")]
    pub output: PathBuf,
}

pub fn run(args: &DroArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(alpha) = args.alpha {
        if !(0.0..=1.0).contains(&alpha) {
            bail!("Alpha {alpha} is outside [0, 1]");
        }
        config.always_alpha = alpha;
    }
    if let Some(algorithm) = args.algorithm {
        config.dro_algorithm = algorithm.into();
    }

    print_merge_settings(MergeMode::Dro, 1, &config);
    let metadata = CaptureMetadata {
        iso: args.iso,
        exposure_time_ns: args.exposure_ns,
    };
    let frame = load_frame(&args.file, metadata)?;
    println!("Loaded {}x{} image", frame.width(), frame.height());

    let reporter = Arc::new(BarReporter::new());
    let output = run_dro(frame, &config, reporter.clone())?;
    reporter.finish();

    print_merge_result(&output, &args.output);
    save_frame(output.frame, &args.output)?;
    println!("Saved to {}", args.output.display());
    Ok(())
}
