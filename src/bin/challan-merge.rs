//! Challan Merge CLI tool
//!
//! Merges certificate PDFs with their challan PDFs per a CSV mapping file.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use challan_merge::batch::{run_batch, BatchConfig, BatchSummary};

/// Challan Merge - append challan PDFs to their tax certificates
#[derive(Parser)]
#[command(name = "challan-merge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge using the default Certificate/, Challan/, Output/ layout
    challan-merge --mapping mapping.csv

    # Explicit directories, four parallel workers
    challan-merge --mapping map.csv --certificates certs/ --challans chal/ --output merged/ --jobs 4

    # Name outputs like the original tool: cert_A_combined.pdf
    challan-merge --mapping mapping.csv --suffix _combined

MAPPING FILE:
    CSV, one row per certificate. First cell: certificate filename (with or
    without .pdf). Remaining cells: challan filenames, appended in order.
    An optional header row is detected and skipped.")]
struct Cli {
    /// Mapping file (CSV) associating certificates with challans
    #[arg(short, long)]
    mapping: PathBuf,

    /// Directory containing the certificate PDFs
    #[arg(long, default_value = "Certificate")]
    certificates: PathBuf,

    /// Directory containing the challan PDFs
    #[arg(long, default_value = "Challan")]
    challans: PathBuf,

    /// Directory to write merged PDFs into (created if absent)
    #[arg(short, long, default_value = "Output")]
    output: PathBuf,

    /// Suffix inserted before the output extension (e.g. "_combined")
    #[arg(long)]
    suffix: Option<String>,

    /// Number of parallel merge workers (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(summary) => {
            report(&summary);
            if summary.failed() > 0 {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<BatchSummary> {
    let mut config = BatchConfig::new(cli.certificates, cli.challans, cli.mapping, cli.output);
    config.output_suffix = cli.suffix;
    config.workers = cli.jobs;

    run_batch(&config).context("batch aborted")
}

fn report(summary: &BatchSummary) {
    println!(
        "Processed {} of {} rows ({} failed)",
        summary.written(),
        summary.outcomes.len(),
        summary.failed()
    );

    for outcome in summary.failures() {
        match &outcome.error {
            Some(error) => eprintln!("  {}: {} - {}", outcome.label(), error.kind(), error),
            None => eprintln!("  {}: failed", outcome.label()),
        }
    }
}
