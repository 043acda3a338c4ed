//! # Application State & Configuration
//!
//! Shared state for all route handlers: the registrar (sole ledger
//! writer), the verification reader (independent read path), the ledger
//! topology, and application configuration.
//!
//! The registrar signing key is loaded from `REGISTRAR_SIGNING_KEY_HEX`
//! when set; otherwise an ephemeral key is generated with a warning, in
//! which case receipt attestations do not survive a restart.

use std::sync::Arc;

use thiserror::Error;

use docket_crypto::{CryptoError, SigningKey};
use docket_quorum::LedgerTopology;
use docket_registrar::Registrar;
use docket_verify::VerificationReader;

// ── Configuration ───────────────────────────────────────────────────

/// Application configuration, built from environment variables.
///
/// Custom `Debug` redacts the auth token to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Static bearer token guarding write routes. `None` disables write
    /// authentication entirely.
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

// ── Signing key loading ─────────────────────────────────────────────

/// Failure to parse a signing key supplied via the environment.
#[derive(Debug, Error)]
#[error("invalid REGISTRAR_SIGNING_KEY_HEX: {0}")]
pub struct KeyError(#[from] CryptoError);

/// Load the registrar signing key from `REGISTRAR_SIGNING_KEY_HEX`, or
/// generate an ephemeral one when the variable is unset.
///
/// # Errors
///
/// Returns [`KeyError`] when the variable is set but does not decode to
/// a 32-byte key. A malformed key is a configuration error, never
/// silently replaced.
pub fn load_or_generate_registrar_key() -> Result<SigningKey, KeyError> {
    if let Ok(hex) = std::env::var("REGISTRAR_SIGNING_KEY_HEX") {
        Ok(SigningKey::from_hex(&hex)?)
    } else {
        tracing::warn!(
            "REGISTRAR_SIGNING_KEY_HEX not set — generating ephemeral key. \
             Receipt attestations signed with this key will not be verifiable after restart."
        );
        Ok(SigningKey::generate(&mut rand_core::OsRng))
    }
}

// ── Application state ───────────────────────────────────────────────

/// Shared application state accessible to all route handlers.
///
/// The registrar is the only component that writes to ledgers; the
/// verification reader reads the same ledgers through its own handles
/// so the public verification path shares no mutable state with intake.
#[derive(Clone)]
pub struct AppState {
    /// Intake service and sole ledger writer.
    pub registrar: Arc<Registrar>,
    /// Independent multi-ledger read path for verification.
    pub reader: Arc<VerificationReader>,
    /// The configured ledger topology, for event polling and reads.
    pub topology: Arc<LedgerTopology>,
    /// Application configuration.
    pub config: AppConfig,
}
