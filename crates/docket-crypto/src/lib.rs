//! # docket-crypto — Evidence Storage and Attestation Keys
//!
//! This crate provides the cryptographic support services for the docket
//! registry:
//!
//! - **Content-addressed evidence storage** ([`cas`]): file bytes stored
//!   under their own SHA-256 fingerprint, with integrity re-checked on
//!   every read.
//! - **Ed25519** signing and verification ([`ed25519`]) for registrar
//!   receipt attestations.
//!
//! Fingerprint computation itself lives in `docket-core`
//! ([`docket_core::sha256_digest`] / [`docket_core::sha256_raw`]); this
//! crate consumes digests, it does not define them.

pub mod cas;
pub mod ed25519;
pub mod error;

// Re-export primary types.
pub use cas::{EvidenceStore, StorageLocator};
pub use ed25519::{Ed25519Signature, SigningKey, VerifyingKey};
pub use error::{CryptoError, StoreError};
