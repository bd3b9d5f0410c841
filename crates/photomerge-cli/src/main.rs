mod commands;
mod io;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photomerge", about = "Merge bursts of photos: HDR fusion, noise averaging and DRO")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuse an exposure bracket into one image
    Hdr(commands::hdr::HdrArgs),
    /// Average a burst of equal exposures to reduce noise
    Avg(commands::avg::AvgArgs),
    /// Dynamic range optimization of a single image
    Dro(commands::dro::DroArgs),
    /// Print luminance histogram statistics of an image
    Histogram(commands::histogram::HistogramArgs),
    /// Print or save the default merge config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Hdr(args) => commands::hdr::run(args),
        Commands::Avg(args) => commands::avg::run(args),
        Commands::Dro(args) => commands::dro::run(args),
        Commands::Histogram(args) => commands::histogram::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
