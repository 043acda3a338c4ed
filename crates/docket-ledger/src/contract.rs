//! # Registry Contract — Case Lifecycle State Machine
//!
//! The deterministic core of the registry: a pure state machine over cases
//! and their evidence entries. Every mutation is driven by a
//! [`BlockContext`] supplied by the hosting ledger, so the contract never
//! reads a wall clock and replaying the same writes against the same
//! contexts rebuilds byte-identical state.
//!
//! ## Lifecycle
//!
//! ```text
//! (none) ──open_case()──▶ OPEN ──add_evidence()──▶ OPEN
//!                           │
//!                      close_case()
//!                           │
//!                           ▼
//!                        CLOSED   (terminal — evidence set is frozen)
//! ```
//!
//! A closed case is immutable: further `add_evidence` calls are rejected
//! even when they replay a fingerprint that is already registered.
//! Closing an already-closed case is a no-op so that redundant-ledger
//! replays converge instead of erroring.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use docket_core::{
    CaseId, ContentDigest, EvidenceCategory, EvidenceId, Jurisdiction, OwnerId, Timestamp,
};
use docket_crypto::StorageLocator;

use crate::event::{EventKind, RegistryEvent};

// ---------------------------------------------------------------------------
// Block context
// ---------------------------------------------------------------------------

/// Ledger-supplied context for a single write.
///
/// The contract takes its notion of time and transaction identity from the
/// block that carries the write, never from the host environment. Ledgers
/// that replay history after a reorganization pass the original contexts
/// back in, which keeps allocated identifiers and recorded timestamps
/// stable across the replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Height of the block carrying this write.
    pub block_height: u64,
    /// Block timestamp, UTC at second precision.
    pub timestamp: Timestamp,
    /// Identifier of the transaction carrying this write.
    pub tx_id: String,
}

impl BlockContext {
    /// Assemble a block context.
    pub fn new(block_height: u64, timestamp: Timestamp, tx_id: impl Into<String>) -> Self {
        Self {
            block_height,
            timestamp,
            tx_id: tx_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Case status
// ---------------------------------------------------------------------------

/// Lifecycle state of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Accepting evidence registrations from the owner.
    Open,
    /// Terminal. The evidence set is frozen.
    Closed,
}

impl CaseStatus {
    /// Canonical lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Whether the case has reached its terminal state.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The on-ledger record of a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Registry-wide case identifier.
    pub case_id: CaseId,
    /// The only principal allowed to mutate the case.
    pub owner: OwnerId,
    /// Jurisdiction tag used for identifier allocation.
    pub jurisdiction: Jurisdiction,
    /// Fingerprint of the canonical case summary.
    pub summary_fingerprint: ContentDigest,
    /// Current lifecycle state.
    pub status: CaseStatus,
    /// Block time of the opening write.
    pub opened_at: Timestamp,
    /// Block time of the closing write, once closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<Timestamp>,
    /// Height of the block that opened the case.
    pub block_height: u64,
    /// Transaction that opened the case.
    pub tx_id: String,
}

/// The on-ledger record of one evidence entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Case the entry belongs to.
    pub case_id: CaseId,
    /// Identifier of the entry within its case.
    pub evidence_id: EvidenceId,
    /// Fingerprint of the raw evidence bytes.
    pub content_fingerprint: ContentDigest,
    /// Where the bytes live in the content-addressed store.
    pub storage_locator: StorageLocator,
    /// Coarse evidence category.
    pub category: EvidenceCategory,
    /// Free-text caption, if the submitter provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Block time of the registering write.
    pub registered_at: Timestamp,
    /// Height of the block that registered the entry.
    pub block_height: u64,
    /// Transaction that registered the entry.
    pub tx_id: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Rejection reasons produced by the registry contract.
///
/// Every variant names the case (and caller, where relevant) so that a
/// rejection logged far from the submitting code still identifies what
/// was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    /// A client-supplied case identifier is already registered.
    #[error("case {0} already exists")]
    DuplicateCase(CaseId),

    /// The referenced case is not registered.
    #[error("case {0} is not registered")]
    CaseNotFound(CaseId),

    /// The case is closed and its evidence set is frozen.
    #[error("case {0} is closed and immutable")]
    CaseClosed(CaseId),

    /// The caller is not the owner of the case.
    #[error("caller {caller} does not own case {case_id}")]
    NotOwner {
        /// Case the caller attempted to mutate.
        case_id: CaseId,
        /// The rejected principal.
        caller: OwnerId,
    },

    /// The evidence identifier is taken by an entry with different content.
    #[error(
        "evidence {evidence_id} on case {case_id} is already registered with a \
         different fingerprint: registered {registered}, submitted {submitted}"
    )]
    DuplicateEvidence {
        /// Case holding the conflicting entry.
        case_id: CaseId,
        /// The contested identifier.
        evidence_id: EvidenceId,
        /// Fingerprint already on the ledger.
        registered: ContentDigest,
        /// Fingerprint the caller tried to register.
        submitted: ContentDigest,
    },
}

// ---------------------------------------------------------------------------
// The contract
// ---------------------------------------------------------------------------

/// In-memory registry state: cases, their evidence, and the event log.
///
/// The contract is deterministic with respect to its inputs. Identifier
/// allocation, timestamps, and event ordering all derive from the
/// [`BlockContext`] of each write, so two contracts fed the same sequence
/// of (context, operation) pairs hold identical state.
#[derive(Debug, Default)]
pub struct RegistryContract {
    cases: BTreeMap<CaseId, CaseEntry>,
    /// Allocation cursor per (jurisdiction, year).
    sequences: BTreeMap<(Jurisdiction, i32), u64>,
    events: Vec<RegistryEvent>,
}

#[derive(Debug)]
struct CaseEntry {
    record: CaseRecord,
    evidence: BTreeMap<EvidenceId, EvidenceRecord>,
}

impl RegistryContract {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a case and return its identifier.
    ///
    /// With `client_case_id` set, that identifier is used verbatim.
    /// Otherwise the registry allocates `{jurisdiction}-{year}-{seq:03}`,
    /// taking the year from the block timestamp and skipping over any
    /// identifier a client already claimed.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::DuplicateCase`] when a client-supplied
    /// identifier is already registered.
    pub fn open_case(
        &mut self,
        ctx: &BlockContext,
        owner: OwnerId,
        jurisdiction: Jurisdiction,
        summary_fingerprint: ContentDigest,
        client_case_id: Option<CaseId>,
    ) -> Result<CaseId, ContractError> {
        let case_id = match client_case_id {
            Some(id) => {
                if self.cases.contains_key(&id) {
                    return Err(ContractError::DuplicateCase(id));
                }
                id
            }
            None => self.allocate_case_id(&jurisdiction, &ctx.timestamp),
        };

        let record = CaseRecord {
            case_id: case_id.clone(),
            owner,
            jurisdiction,
            summary_fingerprint: summary_fingerprint.clone(),
            status: CaseStatus::Open,
            opened_at: ctx.timestamp,
            closed_at: None,
            block_height: ctx.block_height,
            tx_id: ctx.tx_id.clone(),
        };
        self.push_event(ctx, EventKind::CaseOpened, case_id.clone(), None, summary_fingerprint);
        self.cases.insert(
            case_id.clone(),
            CaseEntry {
                record,
                evidence: BTreeMap::new(),
            },
        );
        Ok(case_id)
    }

    /// Register an evidence entry on an open case.
    ///
    /// Re-registering an existing identifier with the identical fingerprint
    /// is a no-op, so retried writes converge. The same identifier with a
    /// different fingerprint is a conflict.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::CaseNotFound`], [`ContractError::CaseClosed`],
    /// [`ContractError::NotOwner`], or [`ContractError::DuplicateEvidence`].
    #[allow(clippy::too_many_arguments)]
    pub fn add_evidence(
        &mut self,
        ctx: &BlockContext,
        caller: &OwnerId,
        case_id: &CaseId,
        evidence_id: EvidenceId,
        content_fingerprint: ContentDigest,
        storage_locator: StorageLocator,
        category: EvidenceCategory,
        description: Option<String>,
    ) -> Result<(), ContractError> {
        let entry = self
            .cases
            .get_mut(case_id)
            .ok_or_else(|| ContractError::CaseNotFound(case_id.clone()))?;
        if entry.record.status.is_closed() {
            return Err(ContractError::CaseClosed(case_id.clone()));
        }
        if caller != &entry.record.owner {
            return Err(ContractError::NotOwner {
                case_id: case_id.clone(),
                caller: caller.clone(),
            });
        }
        if let Some(existing) = entry.evidence.get(&evidence_id) {
            if existing.content_fingerprint == content_fingerprint {
                // Converged replay of an identical registration.
                return Ok(());
            }
            return Err(ContractError::DuplicateEvidence {
                case_id: case_id.clone(),
                evidence_id,
                registered: existing.content_fingerprint.clone(),
                submitted: content_fingerprint,
            });
        }

        let record = EvidenceRecord {
            case_id: case_id.clone(),
            evidence_id: evidence_id.clone(),
            content_fingerprint: content_fingerprint.clone(),
            storage_locator,
            category,
            description,
            registered_at: ctx.timestamp,
            block_height: ctx.block_height,
            tx_id: ctx.tx_id.clone(),
        };
        entry.evidence.insert(evidence_id.clone(), record);
        self.push_event(
            ctx,
            EventKind::EvidenceRegistered,
            case_id.clone(),
            Some(evidence_id),
            content_fingerprint,
        );
        Ok(())
    }

    /// Close a case, freezing its evidence set.
    ///
    /// Closing an already-closed case is a no-op and emits no event.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::CaseNotFound`] or [`ContractError::NotOwner`].
    pub fn close_case(
        &mut self,
        ctx: &BlockContext,
        caller: &OwnerId,
        case_id: &CaseId,
    ) -> Result<(), ContractError> {
        let entry = self
            .cases
            .get_mut(case_id)
            .ok_or_else(|| ContractError::CaseNotFound(case_id.clone()))?;
        if caller != &entry.record.owner {
            return Err(ContractError::NotOwner {
                case_id: case_id.clone(),
                caller: caller.clone(),
            });
        }
        if entry.record.status.is_closed() {
            return Ok(());
        }
        entry.record.status = CaseStatus::Closed;
        entry.record.closed_at = Some(ctx.timestamp);
        let fingerprint = entry.record.summary_fingerprint.clone();
        self.push_event(ctx, EventKind::CaseClosed, case_id.clone(), None, fingerprint);
        Ok(())
    }

    /// Look up a case record. Reads require no authorization.
    pub fn get_case(&self, case_id: &CaseId) -> Option<&CaseRecord> {
        self.cases.get(case_id).map(|entry| &entry.record)
    }

    /// List the evidence entries of a case, ordered by evidence identifier.
    ///
    /// Returns `None` when the case itself is unknown, which callers must
    /// distinguish from a registered case with no evidence yet.
    pub fn get_evidence(&self, case_id: &CaseId) -> Option<Vec<EvidenceRecord>> {
        self.cases
            .get(case_id)
            .map(|entry| entry.evidence.values().cloned().collect())
    }

    /// Number of registered cases.
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// The full event log, oldest first.
    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    /// Events with a sequence number strictly greater than `after`.
    ///
    /// `events_since(0)` returns the full log; pollers pass the highest
    /// sequence they have seen to receive only what is new.
    pub fn events_since(&self, after: u64) -> Vec<RegistryEvent> {
        self.events
            .iter()
            .filter(|event| event.sequence > after)
            .cloned()
            .collect()
    }

    /// Allocate the next free `{jurisdiction}-{year}-{seq:03}` identifier.
    ///
    /// The cursor persists per (jurisdiction, year) so sequences restart
    /// each calendar year. Identifiers claimed directly by clients are
    /// skipped rather than reused.
    fn allocate_case_id(&mut self, jurisdiction: &Jurisdiction, at: &Timestamp) -> CaseId {
        let year = at.as_datetime().year();
        let key = (jurisdiction.clone(), year);
        let mut seq = self.sequences.get(&key).copied().unwrap_or(0);
        let case_id = loop {
            seq += 1;
            let candidate = CaseId::from_parts(jurisdiction, year, seq);
            if !self.cases.contains_key(&candidate) {
                break candidate;
            }
        };
        self.sequences.insert(key, seq);
        case_id
    }

    fn push_event(
        &mut self,
        ctx: &BlockContext,
        kind: EventKind,
        case_id: CaseId,
        evidence_id: Option<EvidenceId>,
        fingerprint: ContentDigest,
    ) {
        let sequence = self.events.len() as u64 + 1;
        self.events.push(RegistryEvent {
            sequence,
            kind,
            case_id,
            evidence_id,
            fingerprint,
            timestamp: ctx.timestamp,
            block_height: ctx.block_height,
            tx_id: ctx.tx_id.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
