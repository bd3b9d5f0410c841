use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use photomerge_core::pipeline::{run_hdr, CancelToken};

use super::{ContrastArg, TonemapArg};
use crate::io::{load_config, load_frames, save_frame};
use crate::progress::BarReporter;
use crate::summary::{print_merge_result, print_merge_settings, MergeMode};

#[derive(Args)]
pub struct HdrArgs {
    /// Bracketed input images
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Index of the reference exposure (defaults to the middle input)
    #[arg(short, long)]
    pub reference: Option<usize>,

    /// ISO per input, or a single value for all
    #[arg(long, value_delimiter = ',')]
    pub iso: Vec<u32>,

    /// Exposure time in nanoseconds per input, or a single value for all
    #[arg(long = "exposure-ns", value_delimiter = ',')]
    pub exposure_ns: Vec<u64>,

    /// Merge config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tonemap operator, overriding the config
    #[arg(long, value_enum)]
    pub tonemap: Option<TonemapArg>,

    /// Local contrast enhancement mode, overriding the config
    #[arg(long, value_enum)]
    pub contrast: Option<ContrastArg>,

    /// Output file path
    #[arg(short, long, default_value = "hdr.png")]
    pub output: PathBuf,
}

pub fn run(args: &HdrArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(tonemap) = args.tonemap {
        config.tonemap_algorithm = tonemap.into();
    }
    if let Some(contrast) = args.contrast {
        config.contrast_enhancement = contrast.into();
    }

    let n = args.files.len();
    let reference = args.reference.unwrap_or(n / 2);
    if reference >= n {
        bail!("Reference index {reference} is out of range for {n} inputs");
    }

    print_merge_settings(MergeMode::Hdr, n, &config);
    let mut frames = load_frames(&args.files, &args.iso, &args.exposure_ns)?;
    println!(
        "Loaded {} frames of {}x{}, reference {}",
        n,
        frames[0].width(),
        frames[0].height(),
        args.files[reference].display()
    );

    let reporter = Arc::new(BarReporter::new());
    let result = run_hdr(&mut frames, reference, &config, &CancelToken::new(), reporter.clone());
    reporter.finish();
    let output = result.with_context(|| format!("HDR merge failed with {} inputs left unmerged", frames.len()))?;

    print_merge_result(&output, &args.output);
    save_frame(output.frame, &args.output)?;
    println!("Saved to {}", args.output.display());
    Ok(())
}
