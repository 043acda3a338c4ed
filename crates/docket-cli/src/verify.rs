//! # Verify Subcommand
//!
//! Independent third-party verification: POSTs candidate file bytes to
//! a running registry's public verification endpoint and renders the
//! per-ledger outcome. Needs no credentials and no local registry state.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Deserialize;
use url::Url;

use crate::retry::send_with_retry;

/// Arguments for the `docket verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Case the evidence belongs to.
    #[arg(value_name = "CASE_ID")]
    pub case_id: String,

    /// Evidence entry to verify against.
    #[arg(value_name = "EVIDENCE_ID")]
    pub evidence_id: String,

    /// Path to the candidate file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Base URL of the registry, e.g. http://localhost:8080
    #[arg(long, value_name = "URL")]
    pub registry_url: String,

    /// Transport-error retries before giving up.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

/// The slice of the registry's verification response the CLI renders.
#[derive(Debug, Deserialize)]
struct VerificationReport {
    verdict: String,
    summary: String,
    registered: bool,
    fingerprint_match: bool,
    confirmation_count: usize,
    #[serde(default)]
    confirmations: Vec<Confirmation>,
    #[serde(default)]
    registered_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Confirmation {
    ledger_id: String,
    reachable: bool,
    record_present: bool,
    fingerprint_match: bool,
    #[serde(default)]
    block_height: Option<u64>,
    #[serde(default)]
    tx_id: Option<String>,
    #[serde(default)]
    explorer_link: Option<String>,
}

/// Execute the verify subcommand.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let base = Url::parse(&args.registry_url)
        .with_context(|| format!("invalid registry URL: {}", args.registry_url))?;
    if !args.file.exists() {
        bail!("file not found: {}", args.file.display());
    }
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("failed to read file: {}", args.file.display()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(verify_remote(args, &base, bytes))
}

async fn verify_remote(args: &VerifyArgs, base: &Url, bytes: Vec<u8>) -> Result<u8> {
    let endpoint = format!(
        "{}/v1/verify/{}/{}",
        base.as_str().trim_end_matches('/'),
        args.case_id,
        args.evidence_id
    );
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let response = send_with_retry(args.retries, || {
        client
            .post(&endpoint)
            .header("content-type", "application/octet-stream")
            .body(bytes.clone())
            .send()
    })
    .await
    .with_context(|| format!("registry unreachable at {endpoint}"))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .context("failed to read registry response")?;

    if !status.is_success() {
        // Render the registry's error envelope if it parses.
        if let Ok(err) = serde_json::from_str::<serde_json::Value>(&body) {
            let code = err["error"]["code"].as_str().unwrap_or("UNKNOWN");
            let message = err["error"]["message"].as_str().unwrap_or(&body);
            println!("FAIL: registry refused ({status}): {code}: {message}");
        } else {
            println!("FAIL: registry refused ({status}): {body}");
        }
        return Ok(1);
    }

    let report: VerificationReport =
        serde_json::from_str(&body).context("registry response did not parse")?;
    render_report(&args.case_id, &args.evidence_id, &report);

    Ok(if report.verdict == "verified" { 0 } else { 1 })
}

/// Print the verification outcome in a human-scannable layout.
fn render_report(case_id: &str, evidence_id: &str, report: &VerificationReport) {
    let headline = match report.verdict.as_str() {
        "verified" => "OK: VERIFIED",
        "fingerprint_mismatch" => "FAIL: FINGERPRINT MISMATCH",
        "unregistered" => "FAIL: NOT REGISTERED",
        "unverifiable" => "WARN: UNVERIFIABLE (no ledger reachable)",
        other => other,
    };
    println!("{headline}");
    println!("case:        {case_id}");
    println!("evidence:    {evidence_id}");
    println!("registered:  {}", report.registered);
    println!("bytes match: {}", report.fingerprint_match);
    if let Some(at) = &report.registered_at {
        println!("registered at: {at}");
    }
    println!(
        "{} ({} confirming)",
        report.summary, report.confirmation_count
    );
    for c in &report.confirmations {
        let detail = if !c.reachable {
            "unreachable".to_string()
        } else if !c.record_present {
            "no record".to_string()
        } else {
            let mut parts = vec![if c.fingerprint_match {
                "confirms".to_string()
            } else {
                "fingerprint differs".to_string()
            }];
            if let Some(height) = c.block_height {
                parts.push(format!("block {height}"));
            }
            if let Some(tx) = &c.tx_id {
                parts.push(tx.clone());
            }
            parts.join(", ")
        };
        match &c.explorer_link {
            Some(link) => println!("  - {}: {detail} ({link})", c.ledger_id),
            None => println!("  - {}: {detail}", c.ledger_id),
        }
    }
}
