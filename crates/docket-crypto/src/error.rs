//! # Cryptographic and Storage Error Types
//!
//! Structured errors for the evidence store and the Ed25519 attestation
//! keys. Uses `thiserror` for ergonomic error definitions with diagnostic
//! context.

use docket_core::ContentDigest;
use thiserror::Error;

use crate::cas::StorageLocator;

/// Errors from the content-addressed evidence store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Stored bytes no longer hash to the digest in their locator.
    ///
    /// Content addressing means this can only happen through on-disk
    /// corruption or tampering. The bytes are never returned.
    #[error("stored content integrity violation: expected {expected}, got {actual}")]
    IntegrityViolation {
        /// The digest the locator promises.
        expected: ContentDigest,
        /// The digest the stored bytes actually hash to.
        actual: ContentDigest,
    },

    /// No content is stored under the given locator.
    #[error("no stored content for {0}")]
    NotFound(StorageLocator),

    /// Locator string does not parse as `cas:sha256:<hex>`.
    #[error("invalid storage locator: \"{0}\" (expected cas:sha256:<64 lowercase hex chars>)")]
    InvalidLocator(String),

    /// Filesystem error during store access.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from Ed25519 key and signature operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("Ed25519 verification failed: {0}")]
    VerificationFailed(String),

    /// Invalid Ed25519 signature length.
    #[error("invalid Ed25519 signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    /// Invalid Ed25519 public key.
    #[error("invalid Ed25519 public key: {0}")]
    InvalidPublicKey(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(String),
}
