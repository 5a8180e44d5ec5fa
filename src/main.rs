//! blockcheck CLI
//!
//! Inspect and compare WAV fixtures from the command line.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use blockcheck::cli::commands;
use blockcheck::cli::{Cli, Commands};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Inspect { path } => {
            print!("{}", commands::inspect(&path, &config)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Compare {
            expected,
            actual,
            tolerance,
        } => match commands::compare(&expected, &actual, tolerance, &config)? {
            None => {
                println!("{} matches {}", actual.display(), expected.display());
                Ok(ExitCode::SUCCESS)
            }
            Some(failure) => {
                println!("{failure}");
                Ok(ExitCode::FAILURE)
            }
        },
    }
}
