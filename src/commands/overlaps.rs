use anyhow::{Context, Result};
use tracing::debug;

use crate::cli::{Cli, OverlapsArgs};
use crate::io::{assert_not_stdout, load_overlaps, persist_overlaps, write_error_log};
use crate::overlap::OverlapOptions;

pub fn run(cli: &Cli, args: &OverlapsArgs) -> Result<()> {
    assert_not_stdout(&args.output)?;

    let options = OverlapOptions { continue_on_error: args.continue_on_error };
    let mut set = load_overlaps(&args.footprints, options)?;
    let inputs = set.len();

    if cli.verbose > 0 {
        eprintln!("[overlaps] footprints={} ({inputs}) -> {}", args.footprints.display(), args.output.display());
    }

    let result = set.decompose_with_progress(|done, total| debug!(done, total, "decomposition progress"));

    // Written even when the run aborted.
    if let Some(path) = &args.errors {
        write_error_log(set.error_log(), path, args.force)?;
    }
    result.context("decomposition aborted")?;

    persist_overlaps(&set, &args.output, args.force)?;

    println!("Decomposed {inputs} footprints into {} records -> {}", set.len(), args.output.display());
    if !set.error_log().is_empty() {
        eprintln!("{} pairwise failures were skipped; see the error log", set.error_log().len());
    }
    Ok(())
}
