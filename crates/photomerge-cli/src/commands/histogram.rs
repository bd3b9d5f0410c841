use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use photomerge_core::frame::{CaptureMetadata, LuminanceProxy};
use photomerge_core::histogram::compute_histogram_with;

use crate::io::load_frame;

#[derive(Clone, Copy, ValueEnum)]
pub enum ProxyArg {
    Max,
    Average,
}

impl From<ProxyArg> for LuminanceProxy {
    fn from(arg: ProxyArg) -> Self {
        match arg {
            ProxyArg::Max => LuminanceProxy::Max,
            ProxyArg::Average => LuminanceProxy::Average,
        }
    }
}

#[derive(Args)]
pub struct HistogramArgs {
    /// Input image
    pub file: PathBuf,

    /// Per-pixel luminance proxy
    #[arg(long, value_enum, default_value = "max")]
    pub proxy: ProxyArg,

    /// Also print every non-empty bin
    #[arg(long)]
    pub bins: bool,
}

pub fn run(args: &HistogramArgs) -> Result<()> {
    let frame = load_frame(&args.file, CaptureMetadata::default())?;
    let proxy = LuminanceProxy::from(args.proxy);
    let histogram = compute_histogram_with(&frame, proxy);

    crate::summary::print_histogram(&args.file, &histogram, &proxy.to_string());

    if args.bins {
        for (bin, &count) in histogram.bins.iter().enumerate() {
            if count > 0 {
                println!("{bin:>5} {count}");
            }
        }
    }
    Ok(())
}
