//! ChurnForge: customer churn analytics CLI
//!
//! Parses arguments, sets up logging, runs the analysis pipeline and prints
//! the report to stdout.

use anyhow::Result;
use churnforge::{pipeline, Args, OutputFormat};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose { "churnforge=debug" } else { "churnforge=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let (report, _records) = pipeline::run(&args)?;

    match args.format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(())
}
