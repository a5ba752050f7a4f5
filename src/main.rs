use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use overlapkit::cli::{Cli, Commands};
use overlapkit::commands::{overlaps, stats};

/// `RUST_LOG` wins; otherwise the `-v` count picks the level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Commands::Overlaps(args) => overlaps::run(&cli, args),
        Commands::Stats(args) => stats::run(&cli, args),
    }
}
