use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use photomerge_core::avg::{avg_sample_size, prepare_frame};
use photomerge_core::consts::{DEFAULT_EXPOSURE_NS, DEFAULT_ISO};
use photomerge_core::pipeline::{run_avg, CancelToken};

use crate::io::{load_config, load_frames, save_frame};
use crate::progress::BarReporter;
use crate::summary::{print_merge_result, print_merge_settings, MergeMode};

#[derive(Args)]
pub struct AvgArgs {
    /// Burst images, merged in the order given
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// ISO per input, or a single value for all
    #[arg(long, value_delimiter = ',')]
    pub iso: Vec<u32>,

    /// Exposure time in nanoseconds per input, or a single value for all
    #[arg(long = "exposure-ns", value_delimiter = ',')]
    pub exposure_ns: Vec<u64>,

    /// Merge config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Temporal Wiener constant, overriding the ISO-derived value
    #[arg(long)]
    pub wiener_c: Option<f32>,

    /// Keep full resolution even for dark or high-ISO captures
    #[arg(long)]
    pub full_resolution: bool,

    /// Output file path
    #[arg(short, long, default_value = "avg.png")]
    pub output: PathBuf,
}

pub fn run(args: &AvgArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(c) = args.wiener_c {
        config.avg.wiener_c = Some(c);
    }

    print_merge_settings(MergeMode::Avg, args.files.len(), &config);
    let frames = load_frames(&args.files, &args.iso, &args.exposure_ns)?;

    let iso = args.iso.first().copied().unwrap_or(DEFAULT_ISO);
    let exposure = args.exposure_ns.first().copied().unwrap_or(DEFAULT_EXPOSURE_NS);
    let sample_size = if args.full_resolution {
        1
    } else {
        avg_sample_size(iso, exposure)
    };
    let frames = if sample_size > 1 {
        println!("Downsampling by {sample_size} (ISO {iso}, {exposure} ns)");
        frames
            .into_iter()
            .map(|f| prepare_frame(f, sample_size))
            .collect::<photomerge_core::error::Result<Vec<_>>>()?
    } else {
        frames
    };
    println!(
        "Loaded {} frames of {}x{}",
        frames.len(),
        frames[0].width(),
        frames[0].height()
    );

    let reporter = Arc::new(BarReporter::new());
    let output = run_avg(frames, &config, &CancelToken::new(), reporter.clone())?;
    reporter.finish();

    print_merge_result(&output, &args.output);
    save_frame(output.frame, &args.output)?;
    println!("Saved to {}", args.output.display());
    Ok(())
}
