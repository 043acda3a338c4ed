//! # Signed Registration Receipts
//!
//! What the registrar hands back for each accepted write: the registered
//! identifiers and fingerprints, where the write landed on the primary
//! ledger, and whether the redundancy quorum was met.
//!
//! ## Attestation
//!
//! Each receipt carries an Ed25519 attestation so downstream indexers can
//! authenticate that it came from this registrar. The signature covers the
//! canonical JSON of the receipt with the `attestation` field absent, so
//! any holder can re-canonicalize the body and check it. Verification of
//! registry content never requires the attestation — the ledgers are the
//! source of truth, the signature only authenticates the courtesy copy.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use docket_core::{
    CanonicalBytes, CanonicalizationError, CaseId, ContentDigest, EvidenceCategory, EvidenceId,
    Jurisdiction, LogicalWriteId, OwnerId,
};
use docket_crypto::{CryptoError, Ed25519Signature, SigningKey, StorageLocator, VerifyingKey};
use docket_ledger::TxRef;

// ---------------------------------------------------------------------------
// Attestation
// ---------------------------------------------------------------------------

/// The registrar's signature over a receipt body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptAttestation {
    /// DID of the signing registrar, derived from its verifying key.
    pub registrar_did: String,
    /// Public key the signature verifies under.
    pub verifying_key: VerifyingKey,
    /// Ed25519 signature over the canonical receipt body.
    pub signature: Ed25519Signature,
}

/// The DID under which a registrar signs: `did:docket:registrar:<key hex>`.
pub fn registrar_did(key: &VerifyingKey) -> String {
    format!("did:docket:registrar:{}", key.to_hex())
}

/// Failures while checking a receipt attestation.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// The receipt carries no attestation to check.
    #[error("receipt carries no attestation")]
    Missing,

    /// The receipt body could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// The signature does not verify over the canonical body.
    #[error("attestation signature rejected: {0}")]
    Signature(#[from] CryptoError),
}

/// A receipt whose canonical body can be signed and checked.
///
/// The body is the receipt serialized with its `attestation` field set to
/// `None`; signing and verification both canonicalize that form, so the
/// attestation never covers itself.
pub trait AttestedReceipt: Serialize + Clone {
    /// The attestation currently attached, if any.
    fn attestation(&self) -> Option<&ReceiptAttestation>;

    /// Attach or clear the attestation.
    fn set_attestation(&mut self, attestation: Option<ReceiptAttestation>);

    /// Canonical bytes of the receipt without its attestation.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError`] if the body cannot be serialized
    /// canonically.
    fn canonical_body(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        let mut body = self.clone();
        body.set_attestation(None);
        CanonicalBytes::new(&body)
    }

    /// Sign the canonical body and attach the attestation.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError`] if the body cannot be serialized
    /// canonically.
    fn attest(&mut self, key: &SigningKey) -> Result<(), CanonicalizationError> {
        let body = self.canonical_body()?;
        let verifying_key = key.verifying_key();
        let signature = key.sign(&body);
        self.set_attestation(Some(ReceiptAttestation {
            registrar_did: registrar_did(&verifying_key),
            verifying_key,
            signature,
        }));
        Ok(())
    }

    /// Check the attached attestation against the canonical body.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError::Missing`] when no attestation is
    /// attached, or [`AttestationError::Signature`] when it does not
    /// verify.
    fn verify_attestation(&self) -> Result<(), AttestationError> {
        let Some(attestation) = self.attestation() else {
            return Err(AttestationError::Missing);
        };
        let body = self.canonical_body()?;
        attestation
            .verifying_key
            .verify(&body, &attestation.signature)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Receipt types
// ---------------------------------------------------------------------------

/// Receipt for a registered case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReceipt {
    /// The registered case, client-supplied or primary-allocated.
    pub case_id: CaseId,
    /// Owner of the case.
    pub owner: OwnerId,
    /// Jurisdiction the identifier was allocated under.
    pub jurisdiction: Jurisdiction,
    /// Fingerprint of the canonical case summary, as recorded on-ledger.
    pub summary_fingerprint: ContentDigest,
    /// Identity of the coordinated write.
    pub logical_write_id: LogicalWriteId,
    /// Where the write landed on the primary ledger.
    pub primary: TxRef,
    /// Whether the redundancy quorum was met.
    pub durable: bool,
    /// Whether any redundant ledger fell behind.
    pub degraded: bool,
    /// Registrar signature over the canonical receipt body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<ReceiptAttestation>,
}

/// Receipt for a registered evidence entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceReceipt {
    /// Case holding the entry.
    pub case_id: CaseId,
    /// The registered entry, client-supplied or content-derived.
    pub evidence_id: EvidenceId,
    /// Fingerprint of the exact submitted bytes, as recorded on-ledger.
    pub content_fingerprint: ContentDigest,
    /// Where the bytes live in the content-addressed store.
    pub storage_locator: StorageLocator,
    /// Coarse evidence category.
    pub category: EvidenceCategory,
    /// Identity of the coordinated write.
    pub logical_write_id: LogicalWriteId,
    /// Where the write landed on the primary ledger.
    pub primary: TxRef,
    /// Whether the redundancy quorum was met.
    pub durable: bool,
    /// Whether any redundant ledger fell behind.
    pub degraded: bool,
    /// Registrar signature over the canonical receipt body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<ReceiptAttestation>,
}

/// Receipt for a closed case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseReceipt {
    /// The closed case.
    pub case_id: CaseId,
    /// Owner who requested the close.
    pub owner: OwnerId,
    /// Identity of the coordinated write.
    pub logical_write_id: LogicalWriteId,
    /// Where the write landed on the primary ledger.
    pub primary: TxRef,
    /// Whether the redundancy quorum was met.
    pub durable: bool,
    /// Whether any redundant ledger fell behind.
    pub degraded: bool,
    /// Registrar signature over the canonical receipt body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<ReceiptAttestation>,
}

impl AttestedReceipt for CaseReceipt {
    fn attestation(&self) -> Option<&ReceiptAttestation> {
        self.attestation.as_ref()
    }

    fn set_attestation(&mut self, attestation: Option<ReceiptAttestation>) {
        self.attestation = attestation;
    }
}

impl AttestedReceipt for EvidenceReceipt {
    fn attestation(&self) -> Option<&ReceiptAttestation> {
        self.attestation.as_ref()
    }

    fn set_attestation(&mut self, attestation: Option<ReceiptAttestation>) {
        self.attestation = attestation;
    }
}

impl AttestedReceipt for CloseReceipt {
    fn attestation(&self) -> Option<&ReceiptAttestation> {
        self.attestation.as_ref()
    }

    fn set_attestation(&mut self, attestation: Option<ReceiptAttestation>) {
        self.attestation = attestation;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
