//! # docket CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Exit code 0 means the command succeeded AND (for `verify`) the
//! evidence checked out; anything else is 1.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docket_cli::fingerprint::{run_fingerprint, FingerprintArgs};
use docket_cli::summary::{run_summary, SummaryArgs};
use docket_cli::verify::{run_verify, VerifyArgs};

/// Docket Registry CLI
///
/// Third-party tooling for the tamper-evident case registry: compute
/// content fingerprints locally, validate case summaries against the
/// versioned schema, and verify evidence against a running registry.
#[derive(Parser, Debug)]
#[command(name = "docket", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute the content fingerprint and storage locator of a file.
    Fingerprint(FingerprintArgs),

    /// Validate a case summary JSON file and compute its fingerprint.
    Summary(SummaryArgs),

    /// Verify a candidate file against a running registry.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Fingerprint(args) => run_fingerprint(&args),
        Commands::Summary(args) => run_summary(&args),
        Commands::Verify(args) => run_verify(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
