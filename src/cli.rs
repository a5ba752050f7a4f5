use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Image footprint overlap CLI
#[derive(Parser, Debug)]
#[command(name = "overlapkit", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decompose footprints into a disjoint overlap list
    Overlaps(OverlapsArgs),

    /// Print coverage statistics for an overlap list
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
pub struct OverlapsArgs {
    /// Footprint list: one WKT polygon per block followed by its image id
    #[arg(value_hint = ValueHint::FilePath)]
    pub footprints: PathBuf,

    /// Output overlap list (".gz" to compress; "-" is rejected)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: PathBuf,

    /// Drop failing pairs and keep going instead of aborting
    #[arg(long)]
    pub continue_on_error: bool,

    /// Write the error log as JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub errors: Option<PathBuf>,

    /// Overwrite outputs if they exist
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Overlap list produced by `overlaps`
    #[arg(value_hint = ValueHint::FilePath)]
    pub overlaps: PathBuf,

    /// Print JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}
