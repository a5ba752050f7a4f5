use anyhow::Result;

use crate::cli::{Cli, StatsArgs};
use crate::io::load_overlaps;
use crate::overlap::OverlapOptions;

pub fn run(cli: &Cli, args: &StatsArgs) -> Result<()> {
    let set = load_overlaps(&args.overlaps, OverlapOptions::default())?;
    let stats = set.coverage_stats();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("records:    {}", stats.records);
    println!("images:     {}", stats.images.len());
    println!("max depth:  {}", stats.max_depth);
    println!("mean depth: {:.3}", stats.mean_depth);
    for (depth, area) in &stats.area_by_depth {
        println!("  depth {depth:>3}: area {area:.6}");
    }

    if cli.verbose > 0 {
        for (id, coverage) in &stats.images {
            println!("  {id}: area {:.6}, overlapped {:.1}%", coverage.total_area, 100.0 * coverage.overlap_fraction());
        }
    }
    Ok(())
}
