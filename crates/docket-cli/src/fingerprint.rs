//! # Fingerprint Subcommand
//!
//! Computes the content fingerprint of a local file exactly as the
//! registrar would: SHA-256 over the raw bytes, no canonicalization.
//! Lets a filing party predict the fingerprint, storage locator, and
//! default evidence identifier before submitting anything.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use docket_core::{sha256_raw, EvidenceId};
use docket_crypto::StorageLocator;

/// Arguments for the `docket fingerprint` subcommand.
#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// Path to the file to fingerprint.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Execute the fingerprint subcommand.
pub fn run_fingerprint(args: &FingerprintArgs) -> Result<u8> {
    if !args.file.exists() {
        bail!("file not found: {}", args.file.display());
    }
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read file: {}", args.file.display()))?;

    let fingerprint = sha256_raw(&bytes);
    let locator = StorageLocator::for_digest(fingerprint.clone());
    let default_id = EvidenceId::from_digest(&fingerprint);

    println!("file:        {}", args.file.display());
    println!("size:        {} bytes", bytes.len());
    println!("fingerprint: {fingerprint}");
    println!("locator:     {locator}");
    println!("evidence_id: {default_id} (default if none supplied)");

    Ok(0)
}
