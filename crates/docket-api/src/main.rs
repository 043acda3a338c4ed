//! # docket-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the docket registry.
//! Binds to configurable port (default 8080).

use std::path::Path;
use std::sync::Arc;

use docket_api::state::{load_or_generate_registrar_key, AppConfig, AppState};
use docket_crypto::EvidenceStore;
use docket_quorum::{Coordinator, RetryConfig, TopologyConfig};
use docket_registrar::{Registrar, WriteJournal};
use docket_verify::{ReaderHandle, VerificationReader};

/// Topology used when `LEDGER_TOPOLOGY` is unset: a single in-process
/// primary, suitable only for development.
const DEFAULT_TOPOLOGY: &str = "ledgers:\n  - id: primary-a\n    role: primary\n";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let auth_token = std::env::var("AUTH_TOKEN").ok();
    if auth_token.is_none() {
        tracing::warn!("AUTH_TOKEN not set — write routes are unauthenticated");
    }
    let config = AppConfig { port, auth_token };

    // Ledger topology: operator-declared YAML, or a single-ledger
    // development default.
    let topology_config = match std::env::var("LEDGER_TOPOLOGY") {
        Ok(path) => {
            tracing::info!(path = %path, "loading ledger topology");
            TopologyConfig::from_yaml_file(Path::new(&path))?
        }
        Err(_) => {
            tracing::warn!(
                "LEDGER_TOPOLOGY not set — running a single in-process primary ledger"
            );
            TopologyConfig::from_yaml_str(DEFAULT_TOPOLOGY)?
        }
    };
    let policy = topology_config.quorum_policy();
    let topology = Arc::new(topology_config.build_in_process()?);
    tracing::info!(
        ledgers = topology.len(),
        redundant_required = policy.redundant_required,
        "ledger topology assembled"
    );

    // Evidence store and write journal.
    // The store creates an `evidence/` subdirectory under this base.
    let store_dir = std::env::var("EVIDENCE_STORE_DIR").unwrap_or_else(|_| "data".to_string());
    let store = EvidenceStore::new(Path::new(&store_dir))?;
    let journal_path =
        std::env::var("WRITE_JOURNAL").unwrap_or_else(|_| "data/journal.jsonl".to_string());
    let journal = WriteJournal::open(&journal_path)?;

    // Registrar over the coordinator, with its receipt-signing key.
    let key = Arc::new(load_or_generate_registrar_key()?);
    let coordinator = Arc::new(Coordinator::new(
        Arc::clone(&topology),
        policy,
        RetryConfig::default(),
    ));
    let registrar = Arc::new(Registrar::new(coordinator, store, key, journal));
    tracing::info!(did = %registrar.did(), "registrar initialized");

    // Verification reader over every configured ledger.
    let handles = topology
        .all()
        .map(|backend| {
            let mut handle = ReaderHandle::new(Arc::clone(backend));
            if let Some(base) = topology.explorer_base(backend.ledger_id()) {
                handle = handle.with_explorer(base.clone());
            }
            handle
        })
        .collect();
    let reader = Arc::new(VerificationReader::new(handles));

    let state = AppState {
        registrar,
        reader,
        topology,
        config,
    };
    let app = docket_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("docket registry API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
