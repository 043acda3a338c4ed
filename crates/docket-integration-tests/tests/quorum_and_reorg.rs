//! Ledger faults as seen end to end: writes driven through the
//! coordinator, then observed through the verification reader. Covers
//! degraded writes, reorg invalidation, and recovery via refresh.

use std::sync::Arc;

use docket_core::{sha256_raw, CaseId, EvidenceCategory, EvidenceId, Jurisdiction, LedgerId, OwnerId};
use docket_crypto::StorageLocator;
use docket_ledger::{InProcessLedger, LedgerBackend, OpResult, RegistryOp};
use docket_quorum::{Coordinator, LedgerTopology, QuorumPolicy, RetryConfig};
use docket_verify::{ReaderHandle, VerificationReader, VerificationVerdict};

const PHOTO: &[u8] = b"kitchen ceiling, day one";

fn rig(
    redundant_required: usize,
) -> (
    Coordinator,
    Arc<InProcessLedger>,
    Vec<Arc<InProcessLedger>>,
) {
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
    let topology = LedgerTopology::new(
        primary.clone() as Arc<dyn LedgerBackend>,
        redundants
            .iter()
            .map(|ledger| ledger.clone() as Arc<dyn LedgerBackend>)
            .collect(),
    )
    .expect("valid topology");
    let coordinator = Coordinator::new(
        Arc::new(topology),
        QuorumPolicy { redundant_required },
        RetryConfig::fast(),
    );
    (coordinator, primary, redundants)
}

fn reader_over(ledgers: &[&Arc<InProcessLedger>]) -> VerificationReader {
    VerificationReader::new(
        ledgers
            .iter()
            .map(|ledger| ReaderHandle::new(Arc::clone(*ledger) as Arc<dyn LedgerBackend>))
            .collect(),
    )
}

fn open_case_op() -> RegistryOp {
    RegistryOp::OpenCase {
        owner: OwnerId::new("tenant-7081").expect("valid owner"),
        jurisdiction: Jurisdiction::new("GA-FULTON").expect("valid jurisdiction"),
        summary_fingerprint: sha256_raw(br#"{"issue":"water_leak"}"#),
        client_case_id: None,
    }
}

fn add_evidence_op(case_id: &CaseId) -> RegistryOp {
    let fingerprint = sha256_raw(PHOTO);
    RegistryOp::AddEvidence {
        caller: OwnerId::new("tenant-7081").expect("valid owner"),
        case_id: case_id.clone(),
        evidence_id: EvidenceId::new("EXH-A-01").expect("valid id"),
        storage_locator: StorageLocator::for_digest(fingerprint.clone()),
        content_fingerprint: fingerprint,
        category: EvidenceCategory::Photo,
        description: None,
    }
}

/// Open a case and register one exhibit; returns the case id and the
/// logical write id of the evidence write.
async fn seed(coordinator: &Coordinator) -> (CaseId, docket_core::LogicalWriteId) {
    let outcome = coordinator.submit(open_case_op()).await.expect("open");
    let OpResult::CaseOpened { case_id } = &outcome.result else {
        panic!("expected CaseOpened, got: {:?}", outcome.result);
    };
    let case_id = case_id.clone();
    let outcome = coordinator
        .submit(add_evidence_op(&case_id))
        .await
        .expect("evidence");
    (case_id, outcome.logical_write_id)
}

fn exhibit() -> EvidenceId {
    EvidenceId::new("EXH-A-01").expect("valid id")
}

// -- Degraded writes ------------------------------------------------------

#[tokio::test]
async fn degraded_write_still_verifies_on_the_primary_alone() {
    let (coordinator, primary, redundants) = rig(1);
    for ledger in &redundants {
        ledger.set_offline(true);
    }

    let (case_id, _) = seed(&coordinator).await;
    assert_eq!(primary.head_height(), 2);
    for ledger in &redundants {
        ledger.set_offline(false);
        // The outage outlasted the retry budget; nothing landed here.
        assert_eq!(ledger.head_height(), 0);
    }

    let reader = reader_over(&[&primary, &redundants[0], &redundants[1]]);
    let result = reader.verify(&case_id, &exhibit(), PHOTO);

    // One honest copy is enough to verify; the thin confirmation count
    // is what tells the caller how much backing the record has.
    assert_eq!(result.verdict(), VerificationVerdict::Verified);
    assert_eq!(result.confirmation_count(), 1);
    assert!(result.registered);
    assert!(result.fingerprint_match);
}

#[tokio::test]
async fn write_below_quorum_is_reported_not_durable() {
    let (coordinator, _primary, redundants) = rig(2);
    redundants[0].set_offline(true);

    let outcome = coordinator.submit(open_case_op()).await.expect("write");
    assert!(!outcome.durable, "one confirmation is below a quorum of two");
    assert!(outcome.degraded);
    assert_eq!(outcome.record.confirmed_redundants(), 1);
}

// -- Reorg resilience -----------------------------------------------------

#[tokio::test]
async fn reorged_confirmation_is_not_counted_by_verify() {
    let (coordinator, primary, redundants) = rig(1);
    let (case_id, _) = seed(&coordinator).await;
    let reader = reader_over(&[&primary, &redundants[0], &redundants[1]]);

    let before = reader.verify(&case_id, &exhibit(), PHOTO);
    assert_eq!(before.confirmation_count(), 3);

    // One redundant rewinds past the evidence write (block 2 of 2).
    redundants[0].trigger_reorg(1);

    let after = reader.verify(&case_id, &exhibit(), PHOTO);
    assert_eq!(
        after.confirmation_count(),
        2,
        "the reorged ledger no longer confirms"
    );
    assert_eq!(after.verdict(), VerificationVerdict::Verified);

    // A rewind of every ledger leaves the record unregistered, never
    // silently verified.
    redundants[1].trigger_reorg(0);
    primary.trigger_reorg(0);
    let wiped = reader.verify(&case_id, &exhibit(), PHOTO);
    assert_eq!(wiped.confirmation_count(), 0);
    assert_ne!(wiped.verdict(), VerificationVerdict::Verified);
}

#[tokio::test]
async fn refresh_after_a_reorg_restores_verification_coverage() {
    let (coordinator, primary, redundants) = rig(1);
    let (case_id, evidence_write) = seed(&coordinator).await;
    let reader = reader_over(&[&primary, &redundants[0], &redundants[1]]);

    redundants[0].trigger_reorg(1);
    assert_eq!(reader.verify(&case_id, &exhibit(), PHOTO).confirmation_count(), 2);

    // Refresh notices the dropped transaction and resubmits it to the
    // reorged redundant.
    let record = coordinator.refresh(&evidence_write).expect("refresh");
    assert!(record.durable);
    assert_eq!(redundants[0].head_height(), 2);

    let restored = reader.verify(&case_id, &exhibit(), PHOTO);
    assert_eq!(restored.confirmation_count(), 3);
    assert_eq!(restored.verdict(), VerificationVerdict::Verified);
}

// -- Reader reachability --------------------------------------------------

#[tokio::test]
async fn offline_ledger_shows_as_unreachable_not_missing() {
    let (coordinator, primary, redundants) = rig(1);
    let (case_id, _) = seed(&coordinator).await;

    redundants[0].set_offline(true);
    let reader = reader_over(&[&primary, &redundants[0]]);
    let result = reader.verify(&case_id, &exhibit(), PHOTO);

    assert_eq!(result.confirmation_count(), 1);
    let offline = result
        .confirmations
        .iter()
        .find(|c| c.ledger_id.as_str() == "redundant-b")
        .expect("every configured ledger gets a confirmation entry");
    assert!(!offline.reachable);
    assert!(!offline.record_present);
}
