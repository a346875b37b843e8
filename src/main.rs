use anyhow::{Context, Result};
use clap::Parser;
use segsect::cli::{Algorithm, Cli};
use segsect::{brute_force, io as segio, pairs, sweep};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Some(jobs) = cli.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("failed to configure the worker thread pool")?;
    }

    let input = File::open(&cli.input).with_context(|| format!("failed to open input file {:?}", cli.input))?;
    let segments = segio::parse_segments(BufReader::new(input))?;
    log::info!("parsed {} segments from {:?}", segments.len(), cli.input);

    let start = Instant::now();
    let result_set = match cli.algorithm {
        Algorithm::Sweep => sweep::find_intersections(&segments, cli.epsilon)?,
        Algorithm::BruteForce => brute_force::find_intersections(&segments, cli.epsilon),
    };
    log::info!(
        "found {} intersecting pairs in {:.2?} using {:?}",
        result_set.len(),
        start.elapsed(),
        cli.algorithm
    );

    let sorted_pairs = pairs::sorted(result_set);
    let output =
        File::create(&cli.output).with_context(|| format!("failed to create output file {:?}", cli.output))?;
    segio::write_pairs(BufWriter::new(output), &sorted_pairs)?;

    Ok(())
}
