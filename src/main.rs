use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::time::Instant;

use shard_finder::cli::{Cli, Command, DistanceArgs, FilterArgs, ReexportArgs};
use shard_finder::distances::{compute_distances, DistanceTable};
use shard_finder::engine::scan_bodies_file;
use shard_finder::export::{json_export::load_dump, write_candidates};
use shard_finder::metrics::ProgressUpdate;
use shard_finder::source::open_gz;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::ComputeDistances(args) => run_compute_distances(&args),
        Command::FilterBodies(args) => run_filter_bodies(&args),
        Command::Reexport(args) => run_reexport(&args),
    }
}

fn run_compute_distances(args: &DistanceArgs) -> Result<()> {
    let bounds = args.bounds()?;
    let t0 = Instant::now();
    let reader = open_gz(&args.systems_file)?;
    let (table, stats) = compute_distances(reader, bounds)
        .with_context(|| format!("computing distances from {}", args.systems_file.display()))?;
    table.save(&args.table)?;
    info!("computeDistances: {} of {} systems kept in {:?}", stats.kept, stats.systems_read, t0.elapsed());
    Ok(())
}

fn run_filter_bodies(args: &FilterArgs) -> Result<()> {
    let cfg = args.to_app_config()?;
    let t0 = Instant::now();
    let table = DistanceTable::load(&args.table)?;
    info!("loadDistances {:?}", t0.elapsed());

    let outcome = scan_bodies_file(&args.bodies_file, &table, &cfg.criteria, &cfg.scan, log_progress, None)
        .with_context(|| format!("scanning {}", args.bodies_file.display()))?;
    outcome.stats.log_summary();

    let t1 = Instant::now();
    write_candidates(&outcome.candidates, &cfg.export)?;
    info!("{} export {:?}", args.sink.format, t1.elapsed());
    Ok(())
}

fn run_reexport(args: &ReexportArgs) -> Result<()> {
    let export = args.to_export_config()?;
    let t0 = Instant::now();
    let candidates = load_dump(&args.dump)?;
    info!("load {:?}", t0.elapsed());
    write_candidates(&candidates, &export)?;
    Ok(())
}

fn log_progress(u: ProgressUpdate) {
    match u.percent {
        Some(p) => info!("[{}] {:.1}% | Read: {} | Queued: {} | Candidates: {} | {:.0} rec/s | Mem used: {} MB | Avail: {} MB",
            u.stage, p, u.records_read, u.queued, u.candidates, u.records_per_sec, u.mem_used_mb, u.mem_avail_mb),
        None => info!("[{}] Read: {} | Queued: {} | Candidates: {} | {:.0} rec/s | Mem used: {} MB | Avail: {} MB",
            u.stage, u.records_read, u.queued, u.candidates, u.records_per_sec, u.mem_used_mb, u.mem_avail_mb),
    }
}
