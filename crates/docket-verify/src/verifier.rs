//! # Verification Reader — Independent Fingerprint Checking
//!
//! The reader answers one question: *do the bytes in my hand match what
//! the ledgers say was registered?* It holds no write credentials and no
//! registrar dependency; everything it reports is recomputed locally from
//! the candidate bytes and read back from ledger state.
//!
//! ## Trust Model
//!
//! The reader trusts nothing it did not compute itself. Candidate bytes
//! are hashed locally; the resulting digest is compared against each
//! ledger's recorded fingerprint in constant time. A ledger that cannot
//! be reached folds into the result as an unreachable confirmation — a
//! verification is never an error, it is a report.
//!
//! ## Reading Through a Reorganization
//!
//! A record that a chain reorganization rolled away is simply absent from
//! that ledger's state, so it contributes no confirmation. The verdict
//! then rests on the remaining ledgers, which is exactly the redundancy
//! the topology exists to provide.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use url::Url;

use docket_core::{
    sha256_raw, CaseId, CaseSummary, ContentDigest, DocketError, EvidenceId, LedgerId, Timestamp,
};
use docket_ledger::{LedgerBackend, LedgerError};

// ---------------------------------------------------------------------------
// Read handles
// ---------------------------------------------------------------------------

/// A read-only view of one configured ledger.
///
/// Wraps the backend together with the optional block-explorer base URL
/// used to render human-followable transaction links.
#[derive(Clone)]
pub struct ReaderHandle {
    backend: Arc<dyn LedgerBackend>,
    explorer_base: Option<Url>,
}

impl ReaderHandle {
    /// Wrap a backend with no explorer.
    pub fn new(backend: Arc<dyn LedgerBackend>) -> Self {
        Self {
            backend,
            explorer_base: None,
        }
    }

    /// Attach the block-explorer base URL for this ledger.
    pub fn with_explorer(mut self, base: Url) -> Self {
        self.explorer_base = Some(base);
        self
    }

    /// Identifier of the wrapped ledger.
    pub fn ledger_id(&self) -> &LedgerId {
        self.backend.ledger_id()
    }

    fn explorer_link(&self, tx_id: &str) -> Option<String> {
        self.explorer_base
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.as_str().trim_end_matches('/'), tx_id))
    }
}

impl std::fmt::Debug for ReaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderHandle")
            .field("ledger_id", self.backend.ledger_id())
            .field("explorer_base", &self.explorer_base)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What one ledger had to say about a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfirmation {
    /// The consulted ledger.
    pub ledger_id: LedgerId,
    /// Whether the ledger answered at all.
    pub reachable: bool,
    /// Whether the ledger holds the record.
    pub record_present: bool,
    /// Whether the recorded fingerprint matches the locally computed one.
    pub fingerprint_match: bool,
    /// Block time the record was registered at, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<Timestamp>,
    /// Height of the registering block, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    /// The registering transaction, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_id: Option<String>,
    /// Human-followable explorer URL for the registering transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_link: Option<String>,
}

/// One-word reading of a [`VerificationResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationVerdict {
    /// At least one ledger confirms the fingerprint.
    Verified,
    /// The record exists, but no ledger's fingerprint matches the
    /// candidate bytes.
    FingerprintMismatch,
    /// Every configured ledger answered and none holds the record.
    Unregistered,
    /// No ledger confirms the record and at least one could not be
    /// consulted, so absence cannot be distinguished from outage.
    Unverifiable,
}

impl VerificationVerdict {
    /// Canonical lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::FingerprintMismatch => "fingerprint_mismatch",
            Self::Unregistered => "unregistered",
            Self::Unverifiable => "unverifiable",
        }
    }
}

impl std::fmt::Display for VerificationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full report of one verification.
///
/// Always produced, never an error: unreachable ledgers, missing records,
/// and mismatching fingerprints are all states of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether any ledger holds the record.
    pub registered: bool,
    /// Whether any ledger's recorded fingerprint matches the candidate.
    pub fingerprint_match: bool,
    /// Per-ledger detail, in topology order (primary first).
    pub confirmations: Vec<LedgerConfirmation>,
    /// Registration block time: the primary's when available, else the
    /// earliest any ledger reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<Timestamp>,
}

impl VerificationResult {
    /// Number of ledgers whose recorded fingerprint matches the candidate.
    pub fn confirmation_count(&self) -> usize {
        self.confirmations
            .iter()
            .filter(|c| c.fingerprint_match)
            .count()
    }

    /// Collapse the report into a one-word verdict.
    ///
    /// An absent record only reads [`VerificationVerdict::Unregistered`]
    /// when every configured ledger actually answered; with any ledger
    /// unreachable it reads [`VerificationVerdict::Unverifiable`], so an
    /// outage can never masquerade as proof of absence.
    pub fn verdict(&self) -> VerificationVerdict {
        if self.fingerprint_match {
            VerificationVerdict::Verified
        } else if self.registered {
            VerificationVerdict::FingerprintMismatch
        } else if self.confirmations.iter().all(|c| c.reachable) {
            VerificationVerdict::Unregistered
        } else {
            VerificationVerdict::Unverifiable
        }
    }
}

// ---------------------------------------------------------------------------
// The reader
// ---------------------------------------------------------------------------

/// What a ledger recorded about one entry, once located.
struct RecordFacts {
    fingerprint: ContentDigest,
    registered_at: Timestamp,
    block_height: u64,
    tx_id: String,
}

/// Read-only verification across every configured ledger.
///
/// The first handle is treated as the primary: its registration time is
/// preferred when aggregating, and its confirmation leads the report.
pub struct VerificationReader {
    handles: Vec<ReaderHandle>,
}

impl VerificationReader {
    /// Build a reader over read handles, primary first.
    pub fn new(handles: Vec<ReaderHandle>) -> Self {
        Self { handles }
    }

    /// The consulted ledgers, in topology order.
    pub fn ledgers(&self) -> impl Iterator<Item = &LedgerId> {
        self.handles.iter().map(ReaderHandle::ledger_id)
    }

    /// Verify candidate evidence bytes against every configured ledger.
    ///
    /// Hashes `candidate_bytes` locally and compares the digest against
    /// the fingerprint each ledger recorded for `evidence_id` on
    /// `case_id`. Infallible: per-ledger failures fold into the result.
    pub fn verify(
        &self,
        case_id: &CaseId,
        evidence_id: &EvidenceId,
        candidate_bytes: &[u8],
    ) -> VerificationResult {
        let candidate = sha256_raw(candidate_bytes);
        self.collect(&candidate, |backend| {
            let entries = backend.get_evidence(case_id)?;
            Ok(entries.and_then(|entries| {
                entries
                    .into_iter()
                    .find(|entry| entry.evidence_id == *evidence_id)
                    .map(|entry| RecordFacts {
                        fingerprint: entry.content_fingerprint,
                        registered_at: entry.registered_at,
                        block_height: entry.block_height,
                        tx_id: entry.tx_id,
                    })
            }))
        })
    }

    /// Verify a candidate case summary against every configured ledger.
    ///
    /// Recomputes the summary fingerprint through the canonicalization
    /// pipeline and compares it against each ledger's recorded
    /// `summary_fingerprint`.
    ///
    /// # Errors
    ///
    /// Fails only when the candidate summary itself is invalid or cannot
    /// be canonicalized; ledger failures fold into the result as with
    /// [`VerificationReader::verify`].
    pub fn verify_case(
        &self,
        case_id: &CaseId,
        summary: &CaseSummary,
    ) -> Result<VerificationResult, DocketError> {
        let candidate = summary.fingerprint()?;
        Ok(self.collect(&candidate, |backend| {
            let record = backend.get_case(case_id)?;
            Ok(record.map(|record| RecordFacts {
                fingerprint: record.summary_fingerprint,
                registered_at: record.opened_at,
                block_height: record.block_height,
                tx_id: record.tx_id,
            }))
        }))
    }

    /// Consult every ledger with `fetch` and fold the answers.
    fn collect<F>(&self, candidate: &ContentDigest, mut fetch: F) -> VerificationResult
    where
        F: FnMut(&dyn LedgerBackend) -> Result<Option<RecordFacts>, LedgerError>,
    {
        let confirmations: Vec<LedgerConfirmation> = self
            .handles
            .iter()
            .map(|handle| match fetch(handle.backend.as_ref()) {
                Ok(Some(facts)) => LedgerConfirmation {
                    ledger_id: handle.ledger_id().clone(),
                    reachable: true,
                    record_present: true,
                    fingerprint_match: digests_match(candidate, &facts.fingerprint),
                    registered_at: Some(facts.registered_at),
                    block_height: Some(facts.block_height),
                    explorer_link: handle.explorer_link(&facts.tx_id),
                    tx_id: Some(facts.tx_id),
                },
                Ok(None) => LedgerConfirmation {
                    ledger_id: handle.ledger_id().clone(),
                    reachable: true,
                    record_present: false,
                    fingerprint_match: false,
                    registered_at: None,
                    block_height: None,
                    tx_id: None,
                    explorer_link: None,
                },
                Err(err) => {
                    tracing::warn!(
                        ledger = %handle.ledger_id(),
                        "ledger unreachable during verification: {err}"
                    );
                    LedgerConfirmation {
                        ledger_id: handle.ledger_id().clone(),
                        reachable: false,
                        record_present: false,
                        fingerprint_match: false,
                        registered_at: None,
                        block_height: None,
                        tx_id: None,
                        explorer_link: None,
                    }
                }
            })
            .collect();

        // Primary first, earliest otherwise.
        let registered_at = confirmations
            .first()
            .and_then(|c| c.registered_at)
            .or_else(|| confirmations.iter().filter_map(|c| c.registered_at).min());

        VerificationResult {
            registered: confirmations.iter().any(|c| c.record_present),
            fingerprint_match: confirmations.iter().any(|c| c.fingerprint_match),
            confirmations,
            registered_at,
        }
    }
}

impl std::fmt::Debug for VerificationReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationReader")
            .field("handles", &self.handles)
            .finish()
    }
}

/// Constant-time digest comparison. Verification compares attacker-visible
/// candidates against recorded fingerprints, so the comparison must not
/// leak where the first differing byte sits.
fn digests_match(candidate: &ContentDigest, recorded: &ContentDigest) -> bool {
    bool::from(candidate.as_bytes().ct_eq(recorded.as_bytes()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
