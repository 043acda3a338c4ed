//! # Summary Subcommand
//!
//! Validates a case summary JSON file against the versioned schema and
//! computes its canonical fingerprint — the exact value an open-case
//! operation would place on the ledgers.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use docket_core::CaseSummary;

/// Arguments for the `docket summary` subcommand.
#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Path to the case summary JSON file.
    #[arg(value_name = "JSON")]
    pub json: PathBuf,
}

/// Execute the summary subcommand.
pub fn run_summary(args: &SummaryArgs) -> Result<u8> {
    if !args.json.exists() {
        bail!("file not found: {}", args.json.display());
    }
    let content = std::fs::read_to_string(&args.json)
        .with_context(|| format!("failed to read file: {}", args.json.display()))?;

    let summary: CaseSummary = match serde_json::from_str(&content) {
        Ok(summary) => summary,
        Err(e) => {
            println!("INVALID: not a case summary: {e}");
            return Ok(1);
        }
    };
    if let Err(e) = summary.validate() {
        println!("INVALID: {e}");
        return Ok(1);
    }

    let fingerprint = summary
        .fingerprint()
        .map_err(|e| anyhow::anyhow!("canonicalization failed: {e}"))?;

    println!("OK: schema_version={}", summary.schema_version);
    println!("issue:       {}", summary.issue);
    println!("fingerprint: {fingerprint}");

    Ok(0)
}
