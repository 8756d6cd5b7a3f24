use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use log::info;
use toptag::{config::DEFAULT_MAX_EVENT_SIZE, Condition, Config};

/// Convert top tagging benchmark tables into per-particle jagged arrays
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Create dataset for training, validation or testing: 'train', 'val' or 'test'
    #[arg(short, long)]
    condition: Condition,

    /// Maximum number of events per output file
    #[arg(long, default_value_t = DEFAULT_MAX_EVENT_SIZE)]
    max_event_size: NonZeroUsize,

    /// Directory containing the input tables
    #[arg(long, default_value = "samples")]
    samples_dir: PathBuf,

    /// Directory for the output files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Do not show a progress bar
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = Config {
        condition: cli.condition,
        max_event_size: cli.max_event_size,
        samples_dir: cli.samples_dir,
        output_dir: cli.output_dir,
        progress: !cli.no_progress,
    };
    let summary = toptag::run(&config)?;
    info!(
        "Converted {} events into {} files",
        summary.events,
        summary.chunks.len()
    );
    Ok(())
}
