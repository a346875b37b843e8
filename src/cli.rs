//! Command-line surface: a thin `clap` derive over the two detectors.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Algorithm {
    /// Bentley-Ottmann style line sweep.
    Sweep,
    /// Pairwise parallel scan, pruned by start-x ordering.
    BruteForce,
}

/// Detects every pairwise intersection among the segments in an input file.
#[derive(Debug, Parser)]
#[command(name = "segsect", version, about)]
pub struct Cli {
    /// Path to a file with one segment per line: `p0 p1 q0 q1`.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Path to write `a_b` intersecting pairs, one per line.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Detection algorithm to use.
    #[arg(short, long, value_enum, default_value = "sweep")]
    pub algorithm: Algorithm,

    /// Collinearity / crossing tolerance.
    #[arg(long, default_value_t = 1e-8)]
    pub epsilon: f64,

    /// Worker threads for the brute-force scan (defaults to rayon's own
    /// heuristic; ignored by the sweep, which is inherently sequential).
    #[arg(short, long)]
    pub jobs: Option<usize>,
}
