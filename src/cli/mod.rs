//! CLI Module
//!
//! Command-line front end for inspecting and comparing WAV fixtures.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Inspect and compare audio fixtures the way the test matchers see them
#[derive(Parser, Debug)]
#[command(name = "blockcheck")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON file overriding spectrum thresholds and tolerances
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a sparkline, levels, validity and strongest frequency
    #[command(name = "inspect")]
    Inspect {
        /// WAV file to inspect
        path: PathBuf,
    },

    /// Compare two WAV files sample by sample
    #[command(name = "compare")]
    Compare {
        /// Expected audio
        expected: PathBuf,

        /// Actual audio
        actual: PathBuf,

        /// Per-sample tolerance (defaults to the configured equality tolerance)
        #[arg(short, long)]
        tolerance: Option<f64>,
    },
}
