//! End-to-end registry scenarios: a filing party opens a case, registers
//! evidence, and a third party verifies the bytes against every ledger.
//!
//! Each test walks the full pipeline — intake validation, canonical
//! fingerprinting, content-addressed storage, coordinated multi-ledger
//! write, receipt attestation, and independent verification.

use std::sync::Arc;

use docket_core::{CaseId, CaseSummary, EvidenceCategory, EvidenceId, Jurisdiction, LedgerId, OwnerId};
use docket_crypto::{EvidenceStore, SigningKey};
use docket_ledger::{ContractError, InProcessLedger, LedgerBackend};
use docket_quorum::{Coordinator, LedgerTopology, QuorumPolicy, RetryConfig};
use docket_registrar::{
    AttestedReceipt, CaseIntake, EvidenceIntake, JournalEntry, Registrar, RegistrarError,
    WriteJournal,
};
use docket_verify::{ReaderHandle, VerificationReader, VerificationVerdict};

const PHOTO: &[u8] = b"kitchen ceiling, day one";

/// The full registry stack over three in-process ledgers.
struct Registry {
    registrar: Registrar,
    reader: VerificationReader,
    primary: Arc<InProcessLedger>,
    journal_path: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

fn registry() -> Registry {
    let dir = tempfile::tempdir().expect("tempdir");
    let primary = Arc::new(InProcessLedger::new(
        LedgerId::new("primary-a").expect("valid id"),
    ));
    let redundants = vec![
        Arc::new(InProcessLedger::new(
            LedgerId::new("redundant-b").expect("valid id"),
        )),
        Arc::new(InProcessLedger::new(
            LedgerId::new("redundant-c").expect("valid id"),
        )),
    ];
    let topology = Arc::new(
        LedgerTopology::new(
            primary.clone() as Arc<dyn LedgerBackend>,
            redundants
                .iter()
                .map(|ledger| ledger.clone() as Arc<dyn LedgerBackend>)
                .collect(),
        )
        .expect("valid topology"),
    );
    let coordinator = Arc::new(Coordinator::new(
        Arc::clone(&topology),
        QuorumPolicy {
            redundant_required: 1,
        },
        RetryConfig::fast(),
    ));
    let store = EvidenceStore::new(dir.path()).expect("store");
    let journal_path = dir.path().join("journal.jsonl");
    let journal = WriteJournal::open(&journal_path).expect("journal");
    let key = Arc::new(SigningKey::generate(&mut rand_core::OsRng));
    let registrar = Registrar::new(coordinator, store, key, journal);

    let reader = VerificationReader::new(
        topology
            .all()
            .map(|backend| ReaderHandle::new(Arc::clone(backend)))
            .collect(),
    );

    Registry {
        registrar,
        reader,
        primary,
        journal_path,
        _dir: dir,
    }
}

fn case_intake() -> CaseIntake {
    CaseIntake {
        client_case_id: Some(CaseId::new("GA-FULTON-2025-001").expect("valid id")),
        owner: OwnerId::new("tenant-7081").expect("valid owner"),
        jurisdiction: Jurisdiction::new("GA-FULTON").expect("valid jurisdiction"),
        summary: CaseSummary::new("water_leak"),
    }
}

fn evidence_intake() -> EvidenceIntake {
    EvidenceIntake {
        owner: OwnerId::new("tenant-7081").expect("valid owner"),
        evidence_id: Some(EvidenceId::new("EXH-A-01").expect("valid id")),
        category: EvidenceCategory::Photo,
        description: Some("ceiling photo, day one".to_string()),
    }
}

// -- Register → verify → tamper -------------------------------------------

#[tokio::test]
async fn register_and_verify_then_detect_tampering() {
    let rig = registry();

    // 1. Open the case.
    let case_receipt = rig
        .registrar
        .register_case(case_intake())
        .await
        .expect("case registered");
    assert_eq!(case_receipt.case_id.as_str(), "GA-FULTON-2025-001");
    assert!(case_receipt.durable);
    assert!(!case_receipt.degraded);
    case_receipt
        .verify_attestation()
        .expect("case receipt attestation verifies");

    // 2. Register the photo.
    let evidence_receipt = rig
        .registrar
        .register_evidence(case_receipt.case_id.clone(), PHOTO, evidence_intake())
        .await
        .expect("evidence registered");
    assert_eq!(evidence_receipt.evidence_id.as_str(), "EXH-A-01");
    assert!(evidence_receipt.durable);
    evidence_receipt
        .verify_attestation()
        .expect("evidence receipt attestation verifies");

    // 3. A third party verifies the original bytes.
    let result = rig.reader.verify(
        &case_receipt.case_id,
        &evidence_receipt.evidence_id,
        PHOTO,
    );
    assert!(result.registered);
    assert!(result.fingerprint_match);
    assert_eq!(result.verdict(), VerificationVerdict::Verified);
    assert!(
        result.confirmation_count() >= 1,
        "expected at least one confirmation, got {}",
        result.confirmation_count()
    );
    assert_eq!(result.confirmation_count(), 3, "all three ledgers confirm");
    assert!(result.registered_at.is_some());

    // 4. One flipped byte must be detected.
    let mut tampered = PHOTO.to_vec();
    tampered[0] ^= 0x01;
    let result = rig.reader.verify(
        &case_receipt.case_id,
        &evidence_receipt.evidence_id,
        &tampered,
    );
    assert!(result.registered, "the record itself is still there");
    assert!(!result.fingerprint_match);
    assert_eq!(result.verdict(), VerificationVerdict::FingerprintMismatch);
    assert_eq!(
        result.confirmation_count(),
        0,
        "a mismatching candidate earns no confirmations"
    );
}

#[tokio::test]
async fn unregistered_evidence_is_reported_as_such() {
    let rig = registry();
    let case_receipt = rig
        .registrar
        .register_case(case_intake())
        .await
        .expect("case registered");

    let result = rig.reader.verify(
        &case_receipt.case_id,
        &EvidenceId::new("EXH-Z-99").expect("valid id"),
        PHOTO,
    );
    assert!(!result.registered);
    assert_eq!(result.verdict(), VerificationVerdict::Unregistered);
}

#[tokio::test]
async fn case_summary_verifies_like_evidence() {
    let rig = registry();
    let intake = case_intake();
    let case_receipt = rig
        .registrar
        .register_case(intake.clone())
        .await
        .expect("case registered");

    let result = rig
        .reader
        .verify_case(&case_receipt.case_id, &intake.summary)
        .expect("valid summary");
    assert_eq!(result.verdict(), VerificationVerdict::Verified);

    // A reworded summary is a different document.
    let mut altered = intake.summary;
    altered.narrative = Some("the ceiling was always fine".to_string());
    let result = rig
        .reader
        .verify_case(&case_receipt.case_id, &altered)
        .expect("valid summary");
    assert_eq!(result.verdict(), VerificationVerdict::FingerprintMismatch);
}

// -- Closed-case immutability ---------------------------------------------

#[tokio::test]
async fn closed_case_freezes_the_evidence_set() {
    let rig = registry();
    let owner = OwnerId::new("tenant-7081").expect("valid owner");

    let case_receipt = rig
        .registrar
        .register_case(case_intake())
        .await
        .expect("case registered");
    rig.registrar
        .register_evidence(case_receipt.case_id.clone(), PHOTO, evidence_intake())
        .await
        .expect("evidence registered");

    let close_receipt = rig
        .registrar
        .close_case(case_receipt.case_id.clone(), owner.clone())
        .await
        .expect("case closed");
    close_receipt
        .verify_attestation()
        .expect("close receipt attestation verifies");

    // New evidence is rejected with CaseClosed, every time.
    let late = EvidenceIntake {
        evidence_id: Some(EvidenceId::new("EXH-B-01").expect("valid id")),
        ..evidence_intake()
    };
    let err = rig
        .registrar
        .register_evidence(case_receipt.case_id.clone(), b"forged addendum", late)
        .await
        .expect_err("closed case must refuse evidence");
    assert!(
        matches!(
            &err,
            RegistrarError::LedgerRejected(ContractError::CaseClosed(id))
                if id == &case_receipt.case_id
        ),
        "got: {err:?}"
    );

    // The evidence list is exactly what it was at close.
    let entries = rig
        .primary
        .get_evidence(&case_receipt.case_id)
        .expect("reachable")
        .expect("case exists");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].evidence_id.as_str(), "EXH-A-01");

    // Closing again is accepted without effect.
    rig.registrar
        .close_case(case_receipt.case_id.clone(), owner)
        .await
        .expect("close is idempotent");
}

#[tokio::test]
async fn only_the_owner_can_close_or_extend_a_case() {
    let rig = registry();
    let case_receipt = rig
        .registrar
        .register_case(case_intake())
        .await
        .expect("case registered");

    let stranger = OwnerId::new("tenant-9999").expect("valid owner");
    let err = rig
        .registrar
        .close_case(case_receipt.case_id.clone(), stranger.clone())
        .await
        .expect_err("stranger cannot close");
    assert!(matches!(
        err,
        RegistrarError::LedgerRejected(ContractError::NotOwner { .. })
    ));

    let intruding = EvidenceIntake {
        owner: stranger,
        ..evidence_intake()
    };
    let err = rig
        .registrar
        .register_evidence(case_receipt.case_id.clone(), PHOTO, intruding)
        .await
        .expect_err("stranger cannot add evidence");
    assert!(matches!(
        err,
        RegistrarError::LedgerRejected(ContractError::NotOwner { .. })
    ));
}

// -- No silent overwrite --------------------------------------------------

#[tokio::test]
async fn resubmitting_identical_evidence_is_idempotent() {
    let rig = registry();
    let case_receipt = rig
        .registrar
        .register_case(case_intake())
        .await
        .expect("case registered");

    let first = rig
        .registrar
        .register_evidence(case_receipt.case_id.clone(), PHOTO, evidence_intake())
        .await
        .expect("first registration");
    let second = rig
        .registrar
        .register_evidence(case_receipt.case_id.clone(), PHOTO, evidence_intake())
        .await
        .expect("identical resubmission is a no-op");
    assert_eq!(first.content_fingerprint, second.content_fingerprint);

    let entries = rig
        .primary
        .get_evidence(&case_receipt.case_id)
        .expect("reachable")
        .expect("case exists");
    assert_eq!(entries.len(), 1, "no duplicate entry was appended");
}

#[tokio::test]
async fn conflicting_bytes_under_the_same_id_are_rejected() {
    let rig = registry();
    let case_receipt = rig
        .registrar
        .register_case(case_intake())
        .await
        .expect("case registered");

    rig.registrar
        .register_evidence(case_receipt.case_id.clone(), PHOTO, evidence_intake())
        .await
        .expect("original registration");
    let err = rig
        .registrar
        .register_evidence(
            case_receipt.case_id.clone(),
            b"a different photo entirely",
            evidence_intake(),
        )
        .await
        .expect_err("conflicting fingerprint must be refused");
    assert!(matches!(
        err,
        RegistrarError::LedgerRejected(ContractError::DuplicateEvidence { .. })
    ));
}

// -- Validation stops before any side effect ------------------------------

#[tokio::test]
async fn invalid_summary_never_reaches_storage_or_ledger() {
    let rig = registry();
    let mut intake = case_intake();
    intake.summary.schema_version = 99;

    let err = rig
        .registrar
        .register_case(intake)
        .await
        .expect_err("unsupported schema version");
    assert!(matches!(err, RegistrarError::Validation(_)));
    assert_eq!(rig.primary.head_height(), 0, "nothing was written");
}

// -- Journal --------------------------------------------------------------

#[tokio::test]
async fn every_settled_write_lands_in_the_journal() {
    let rig = registry();
    let case_receipt = rig
        .registrar
        .register_case(case_intake())
        .await
        .expect("case registered");
    rig.registrar
        .register_evidence(case_receipt.case_id.clone(), PHOTO, evidence_intake())
        .await
        .expect("evidence registered");
    rig.registrar
        .close_case(
            case_receipt.case_id.clone(),
            OwnerId::new("tenant-7081").expect("valid owner"),
        )
        .await
        .expect("case closed");

    let entries: Vec<JournalEntry> = WriteJournal::load(&rig.journal_path).expect("journal loads");
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|entry| entry.record.durable));
}
