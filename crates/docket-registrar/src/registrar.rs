//! # Registrar — The Sole Writer
//!
//! Every mutation of the registry enters through the [`Registrar`]: it
//! validates intake, fingerprints content, and hands fully-formed
//! operations to the write coordinator. Nothing else in the system holds
//! a write path to any ledger.
//!
//! ## The Double-Computation Defense
//!
//! Evidence registration never trusts the content store. The registrar
//! fingerprints the submitted bytes itself, uploads them, requires the
//! store's locator to name that same digest, then fetches the bytes back
//! and rehashes them. Only when all three digests agree does the
//! fingerprint reach a ledger. A storage backend that substitutes content
//! produces [`RegistrarError::FingerprintMismatch`] — the evidence is
//! never registered, and the failure is never retried with different
//! bytes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use docket_core::{
    sha256_digest, sha256_raw, CanonicalBytes, CanonicalizationError, CaseId, CaseSummary,
    ContentDigest, EvidenceCategory, EvidenceId, Jurisdiction, OwnerId, ValidationError,
};
use docket_crypto::{EvidenceStore, SigningKey, StoreError, VerifyingKey};
use docket_ledger::{ContractError, LedgerError, RegistryOp};
use docket_quorum::{Coordinator, CoordinatorError, WriteOutcome};

use crate::journal::WriteJournal;
use crate::receipt::{
    registrar_did, AttestedReceipt, CaseReceipt, CloseReceipt, EvidenceReceipt,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the registration paths.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// Intake failed domain validation. Nothing reached storage or any
    /// ledger.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The content store refused the upload or could not serve the bytes
    /// back. Retryable: the same bytes can be resubmitted.
    #[error("evidence upload failed: {0}")]
    UploadFailed(#[source] StoreError),

    /// The store would serve different bytes than were submitted. Fatal:
    /// the evidence was not registered and must not be retried against
    /// this store.
    #[error("stored content does not match submitted bytes: submitted {submitted}, stored {stored}")]
    FingerprintMismatch {
        /// Digest of the bytes the client submitted.
        submitted: ContentDigest,
        /// Digest the store's copy actually carries.
        stored: ContentDigest,
    },

    /// The registry contract rejected the operation.
    #[error("ledger rejected the operation: {0}")]
    LedgerRejected(#[source] ContractError),

    /// The coordinated write failed for infrastructure reasons.
    #[error("ledger write failed: {0}")]
    WriteFailed(#[source] CoordinatorError),

    /// A receipt body could not be canonicalized.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// What a filing party supplies to open a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseIntake {
    /// Pre-claimed case identifier; the primary ledger allocates one when
    /// absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_case_id: Option<CaseId>,
    /// Principal that will own the case.
    pub owner: OwnerId,
    /// Jurisdiction tag for identifier allocation.
    pub jurisdiction: Jurisdiction,
    /// The structured summary; only its fingerprint reaches a ledger.
    pub summary: CaseSummary,
}

/// What a filing party supplies alongside evidence bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceIntake {
    /// Calling principal; must own the target case.
    pub owner: OwnerId,
    /// Identifier for the entry; derived from the content fingerprint
    /// (`EV-` + 12 hex chars) when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_id: Option<EvidenceId>,
    /// Coarse evidence category.
    pub category: EvidenceCategory,
    /// Free-text caption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// The registrar
// ---------------------------------------------------------------------------

/// The intake service and sole ledger writer.
pub struct Registrar {
    coordinator: Arc<Coordinator>,
    store: EvidenceStore,
    key: Arc<SigningKey>,
    journal: WriteJournal,
}

impl Registrar {
    /// Assemble a registrar over its collaborators.
    pub fn new(
        coordinator: Arc<Coordinator>,
        store: EvidenceStore,
        key: Arc<SigningKey>,
        journal: WriteJournal,
    ) -> Self {
        Self {
            coordinator,
            store,
            key,
            journal,
        }
    }

    /// The public half of the receipt-signing key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// The DID this registrar signs receipts under.
    pub fn did(&self) -> String {
        registrar_did(&self.key.verifying_key())
    }

    /// The evidence store registrations upload into.
    pub fn store(&self) -> &EvidenceStore {
        &self.store
    }

    /// The coordinator carrying this registrar's writes.
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Validate an intake, fingerprint its summary, and open the case on
    /// every configured ledger.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::Validation`] for a summary that fails
    /// schema validation, [`RegistrarError::LedgerRejected`] when the
    /// contract refuses (for example a duplicate client-supplied
    /// identifier), and [`RegistrarError::WriteFailed`] when the primary
    /// ledger cannot be written.
    pub async fn register_case(&self, intake: CaseIntake) -> Result<CaseReceipt, RegistrarError> {
        intake.summary.validate()?;
        let summary_fingerprint = sha256_digest(&CanonicalBytes::new(&intake.summary)?);

        let op = RegistryOp::OpenCase {
            owner: intake.owner.clone(),
            jurisdiction: intake.jurisdiction.clone(),
            summary_fingerprint: summary_fingerprint.clone(),
            client_case_id: intake.client_case_id,
        };
        let outcome = self.submit(op).await?;
        let case_id = outcome.result.case_id().clone();
        tracing::info!(
            case_id = %case_id,
            owner = %intake.owner,
            durable = outcome.durable,
            "case registered"
        );

        let mut receipt = CaseReceipt {
            case_id,
            owner: intake.owner,
            jurisdiction: intake.jurisdiction,
            summary_fingerprint,
            logical_write_id: outcome.logical_write_id,
            primary: outcome.primary,
            durable: outcome.durable,
            degraded: outcome.degraded,
            attestation: None,
        };
        receipt.attest(&self.key)?;
        Ok(receipt)
    }

    /// Store evidence bytes, prove the store will serve them back intact,
    /// and register their fingerprint on every configured ledger.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::UploadFailed`] when storage is
    /// unreachable, [`RegistrarError::FingerprintMismatch`] when the
    /// store's copy disagrees with the submitted bytes, and
    /// [`RegistrarError::LedgerRejected`] for contract refusals
    /// (unknown case, wrong owner, closed case, conflicting duplicate).
    pub async fn register_evidence(
        &self,
        case_id: CaseId,
        bytes: &[u8],
        intake: EvidenceIntake,
    ) -> Result<EvidenceReceipt, RegistrarError> {
        // Fingerprint the submitted bytes before the store sees them.
        let content_fingerprint = sha256_raw(bytes);

        let locator = self
            .store
            .put(bytes)
            .map_err(|e| store_error(&case_id, e))?;
        if *locator.digest() != content_fingerprint {
            return Err(self.reject_substitution(&case_id, &content_fingerprint, locator.digest()));
        }

        // Fetch back and rehash: the fingerprint reaches a ledger only
        // when the bytes the store will serve are the bytes submitted.
        let fetched = self
            .store
            .get(&locator)
            .map_err(|e| store_error(&case_id, e))?;
        let fetched_fingerprint = sha256_raw(&fetched);
        if fetched_fingerprint != content_fingerprint {
            return Err(self.reject_substitution(&case_id, &content_fingerprint, &fetched_fingerprint));
        }

        let evidence_id = intake
            .evidence_id
            .unwrap_or_else(|| EvidenceId::from_digest(&content_fingerprint));
        let op = RegistryOp::AddEvidence {
            caller: intake.owner,
            case_id: case_id.clone(),
            evidence_id: evidence_id.clone(),
            content_fingerprint: content_fingerprint.clone(),
            storage_locator: locator.clone(),
            category: intake.category,
            description: intake.description,
        };
        let outcome = self.submit(op).await?;
        tracing::info!(
            case_id = %case_id,
            evidence_id = %evidence_id,
            fingerprint = %content_fingerprint,
            durable = outcome.durable,
            "evidence registered"
        );

        let mut receipt = EvidenceReceipt {
            case_id,
            evidence_id,
            content_fingerprint,
            storage_locator: locator,
            category: intake.category,
            logical_write_id: outcome.logical_write_id,
            primary: outcome.primary,
            durable: outcome.durable,
            degraded: outcome.degraded,
            attestation: None,
        };
        receipt.attest(&self.key)?;
        Ok(receipt)
    }

    /// Close a case, freezing its evidence set.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrarError::LedgerRejected`] for an unknown case or
    /// a caller that does not own it. Closing an already-closed case is
    /// accepted without effect.
    pub async fn close_case(
        &self,
        case_id: CaseId,
        owner: OwnerId,
    ) -> Result<CloseReceipt, RegistrarError> {
        let op = RegistryOp::CloseCase {
            caller: owner.clone(),
            case_id: case_id.clone(),
        };
        let outcome = self.submit(op).await?;
        tracing::info!(case_id = %case_id, durable = outcome.durable, "case closed");

        let mut receipt = CloseReceipt {
            case_id,
            owner,
            logical_write_id: outcome.logical_write_id,
            primary: outcome.primary,
            durable: outcome.durable,
            degraded: outcome.degraded,
            attestation: None,
        };
        receipt.attest(&self.key)?;
        Ok(receipt)
    }

    /// Submit through the coordinator and journal the settled record.
    async fn submit(&self, op: RegistryOp) -> Result<WriteOutcome, RegistrarError> {
        let outcome = self.coordinator.submit(op).await.map_err(|err| match err {
            CoordinatorError::PrimaryWriteFailed(LedgerError::Rejected { source, .. }) => {
                RegistrarError::LedgerRejected(source)
            }
            other => RegistrarError::WriteFailed(other),
        })?;

        if let Err(e) = self.journal.append(&outcome.record) {
            // A journal gap costs recovery convenience, not correctness;
            // the ledgers already hold the write.
            tracing::error!(
                logical_write_id = %outcome.logical_write_id,
                "journal append failed: {e}"
            );
        }
        Ok(outcome)
    }

    fn reject_substitution(
        &self,
        case_id: &CaseId,
        submitted: &ContentDigest,
        stored: &ContentDigest,
    ) -> RegistrarError {
        tracing::error!(
            case_id = %case_id,
            submitted = %submitted,
            stored = %stored,
            "content store would serve different bytes than were submitted"
        );
        RegistrarError::FingerprintMismatch {
            submitted: submitted.clone(),
            stored: stored.clone(),
        }
    }
}

/// Map a store failure: integrity violations are substitutions (fatal),
/// everything else is a retryable upload failure.
fn store_error(case_id: &CaseId, e: StoreError) -> RegistrarError {
    match e {
        StoreError::IntegrityViolation { expected, actual } => {
            tracing::error!(
                case_id = %case_id,
                submitted = %expected,
                stored = %actual,
                "content store would serve different bytes than were submitted"
            );
            RegistrarError::FingerprintMismatch {
                submitted: expected,
                stored: actual,
            }
        }
        other => RegistrarError::UploadFailed(other),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::LedgerId;
    use docket_ledger::{InProcessLedger, LedgerBackend};
    use docket_quorum::{LedgerTopology, QuorumPolicy, RetryConfig};

    fn rig() -> (Registrar, Arc<InProcessLedger>, Arc<InProcessLedger>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let primary = Arc::new(InProcessLedger::new(
            LedgerId::new("primary-a").expect("valid id"),
        ));
        let redundant = Arc::new(InProcessLedger::new(
            LedgerId::new("redundant-b").expect("valid id"),
        ));
        let topology = LedgerTopology::new(
            primary.clone() as Arc<dyn LedgerBackend>,
            vec![redundant.clone() as Arc<dyn LedgerBackend>],
        )
        .expect("valid topology");
        let coordinator = Arc::new(Coordinator::new(
            Arc::new(topology),
            QuorumPolicy {
                redundant_required: 1,
            },
            RetryConfig::fast(),
        ));
        let store = EvidenceStore::new(dir.path()).expect("store");
        let journal = WriteJournal::open(dir.path().join("journal.jsonl")).expect("journal");
        let key = Arc::new(SigningKey::generate(&mut rand_core::OsRng));
        let registrar = Registrar::new(coordinator, store, key, journal);
        (registrar, primary, redundant, dir)
    }

    fn case_intake() -> CaseIntake {
        CaseIntake {
            client_case_id: Some(CaseId::new("GA-FULTON-2025-001").expect("valid case id")),
            owner: OwnerId::new("tenant-7081").expect("valid owner"),
            jurisdiction: Jurisdiction::new("GA-FULTON").expect("valid jurisdiction"),
            summary: CaseSummary::new("water_leak"),
        }
    }

    fn evidence_intake() -> EvidenceIntake {
        EvidenceIntake {
            owner: OwnerId::new("tenant-7081").expect("valid owner"),
            evidence_id: Some(EvidenceId::new("EXH-A-01").expect("valid evidence id")),
            category: EvidenceCategory::Photo,
            description: Some("kitchen ceiling, day one".to_owned()),
        }
    }

    // -- register_case ------------------------------------------------------

    #[tokio::test]
    async fn register_case_returns_an_attested_receipt() {
        let (registrar, primary, redundant, _dir) = rig();
        let intake = case_intake();
        let expected_fingerprint = intake.summary.fingerprint().expect("fingerprint");

        let receipt = registrar.register_case(intake).await.expect("register");
        assert_eq!(receipt.case_id.as_str(), "GA-FULTON-2025-001");
        assert_eq!(receipt.summary_fingerprint, expected_fingerprint);
        assert!(receipt.durable);
        assert!(!receipt.degraded);
        receipt.verify_attestation().expect("valid attestation");

        // Registered on the primary and corroborated on the redundant.
        assert!(primary.get_case(&receipt.case_id).expect("read").is_some());
        assert!(redundant.get_case(&receipt.case_id).expect("read").is_some());
    }

    #[tokio::test]
    async fn register_case_allocates_when_no_identifier_is_claimed() {
        let (registrar, _primary, _redundant, _dir) = rig();
        let mut intake = case_intake();
        intake.client_case_id = None;

        let receipt = registrar.register_case(intake).await.expect("register");
        assert!(receipt.case_id.as_str().starts_with("GA-FULTON-"));
        assert!(receipt.case_id.as_str().ends_with("-001"));
    }

    #[tokio::test]
    async fn invalid_summary_never_reaches_a_ledger() {
        let (registrar, primary, _redundant, _dir) = rig();
        let mut intake = case_intake();
        intake.summary.schema_version = 99;

        let err = registrar.register_case(intake).await.unwrap_err();
        assert!(
            matches!(
                err,
                RegistrarError::Validation(ValidationError::UnsupportedSchemaVersion { .. })
            ),
            "got: {err:?}"
        );
        assert_eq!(primary.head_height(), 0);
    }

    #[tokio::test]
    async fn duplicate_case_is_rejected_verbatim() {
        let (registrar, _primary, _redundant, _dir) = rig();
        registrar
            .register_case(case_intake())
            .await
            .expect("first registration");

        let err = registrar.register_case(case_intake()).await.unwrap_err();
        assert!(
            matches!(
                err,
                RegistrarError::LedgerRejected(ContractError::DuplicateCase(_))
            ),
            "got: {err:?}"
        );
    }

    // -- register_evidence --------------------------------------------------

    #[tokio::test]
    async fn register_evidence_stores_fingerprints_and_attests() {
        let (registrar, primary, _redundant, _dir) = rig();
        let case = registrar
            .register_case(case_intake())
            .await
            .expect("register case");

        let bytes = b"photo of the kitchen ceiling";
        let receipt = registrar
            .register_evidence(case.case_id.clone(), bytes, evidence_intake())
            .await
            .expect("register evidence");

        assert_eq!(receipt.evidence_id.as_str(), "EXH-A-01");
        assert_eq!(receipt.content_fingerprint, sha256_raw(bytes));
        assert_eq!(*receipt.storage_locator.digest(), sha256_raw(bytes));
        receipt.verify_attestation().expect("valid attestation");

        // The bytes are fetchable and the ledger carries the entry.
        assert_eq!(
            registrar.store().get(&receipt.storage_locator).expect("stored"),
            bytes
        );
        let entries = primary
            .get_evidence(&case.case_id)
            .expect("read")
            .expect("known case");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].content_fingerprint, sha256_raw(bytes));
    }

    #[tokio::test]
    async fn evidence_id_defaults_to_the_content_fingerprint() {
        let (registrar, _primary, _redundant, _dir) = rig();
        let case = registrar
            .register_case(case_intake())
            .await
            .expect("register case");

        let bytes = b"unlabeled scan";
        let mut intake = evidence_intake();
        intake.evidence_id = None;
        let receipt = registrar
            .register_evidence(case.case_id, bytes, intake)
            .await
            .expect("register evidence");

        let expected = format!("EV-{}", &sha256_raw(bytes).to_hex()[..12]);
        assert_eq!(receipt.evidence_id.as_str(), expected);
    }

    #[tokio::test]
    async fn evidence_for_an_unknown_case_is_rejected() {
        let (registrar, _primary, _redundant, _dir) = rig();
        let ghost = CaseId::new("GA-FULTON-2025-999").expect("valid case id");

        let err = registrar
            .register_evidence(ghost, b"orphan bytes", evidence_intake())
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                RegistrarError::LedgerRejected(ContractError::CaseNotFound(_))
            ),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn only_the_owner_may_add_evidence() {
        let (registrar, _primary, _redundant, _dir) = rig();
        let case = registrar
            .register_case(case_intake())
            .await
            .expect("register case");

        let mut intake = evidence_intake();
        intake.owner = OwnerId::new("landlord-22").expect("valid owner");
        let err = registrar
            .register_evidence(case.case_id, b"contested", intake)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                RegistrarError::LedgerRejected(ContractError::NotOwner { .. })
            ),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn substituted_store_content_is_never_registered() {
        let (registrar, primary, _redundant, dir) = rig();
        let case = registrar
            .register_case(case_intake())
            .await
            .expect("register case");
        let height_after_open = primary.head_height();

        // Plant an impostor file where these bytes would be stored.
        let bytes = b"the real photograph";
        let digest = sha256_raw(bytes);
        let planted = dir
            .path()
            .join("evidence")
            .join(format!("{}.bin", digest.to_hex()));
        std::fs::write(&planted, b"an impostor").expect("plant");

        let err = registrar
            .register_evidence(case.case_id.clone(), bytes, evidence_intake())
            .await
            .unwrap_err();
        assert!(
            matches!(err, RegistrarError::FingerprintMismatch { .. }),
            "got: {err:?}"
        );

        // Nothing reached the ledger.
        assert_eq!(primary.head_height(), height_after_open);
        let entries = primary
            .get_evidence(&case.case_id)
            .expect("read")
            .expect("known case");
        assert!(entries.is_empty());
    }

    // -- close_case ---------------------------------------------------------

    #[tokio::test]
    async fn close_case_freezes_the_evidence_set() {
        let (registrar, _primary, _redundant, _dir) = rig();
        let owner = OwnerId::new("tenant-7081").expect("valid owner");
        let case = registrar
            .register_case(case_intake())
            .await
            .expect("register case");

        let close = registrar
            .close_case(case.case_id.clone(), owner)
            .await
            .expect("close");
        close.verify_attestation().expect("valid attestation");

        let err = registrar
            .register_evidence(case.case_id, b"late filing", evidence_intake())
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                RegistrarError::LedgerRejected(ContractError::CaseClosed(_))
            ),
            "got: {err:?}"
        );
    }

    // -- Degradation and journaling ----------------------------------------

    #[tokio::test]
    async fn redundant_outage_degrades_the_receipt() {
        let (registrar, primary, redundant, _dir) = rig();
        redundant.fail_next_submits(10);

        let receipt = registrar
            .register_case(case_intake())
            .await
            .expect("register");
        assert!(receipt.degraded);
        // The only redundant never confirmed, so primary-plus-one is unmet.
        assert!(!receipt.durable);
        assert!(primary.get_case(&receipt.case_id).expect("read").is_some());
    }

    #[tokio::test]
    async fn every_write_lands_in_the_journal() {
        let (registrar, _primary, _redundant, dir) = rig();
        let owner = OwnerId::new("tenant-7081").expect("valid owner");

        let case = registrar
            .register_case(case_intake())
            .await
            .expect("register case");
        registrar
            .register_evidence(case.case_id.clone(), b"exhibit", evidence_intake())
            .await
            .expect("register evidence");
        registrar
            .close_case(case.case_id, owner)
            .await
            .expect("close");

        let path = dir.path().join("journal.jsonl");
        let entries = WriteJournal::load(&path).expect("load");
        assert_eq!(entries.len(), 3);
        let replayed = WriteJournal::replay(&path).expect("replay");
        assert_eq!(replayed.len(), 3);
        assert!(replayed.values().all(|record| record.durable));
    }
}
