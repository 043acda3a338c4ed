//! # Ledger Backends — Pluggable Write Targets
//!
//! A [`LedgerBackend`] is anything that can carry the registry contract:
//! the in-process reference ledger below, or an adapter speaking to an
//! external chain. The write coordinator treats every backend uniformly
//! through this trait, which is what lets a deployment swap its redundant
//! ledgers without touching submission logic.
//!
//! ## Object Safety
//!
//! The trait is object-safe. Topologies hold backends as
//! `Arc<dyn LedgerBackend>` and fan writes out over dynamic dispatch, so
//! methods take `&self` and avoid generics.
//!
//! ## The In-Process Ledger
//!
//! [`InProcessLedger`] hosts a [`RegistryContract`] behind a lock and
//! mints one block per accepted write, with the block timestamp taken at
//! apply time. It exists for development and for durability testing: the
//! fault-injection switches simulate an unreachable ledger, delayed
//! confirmations, and chain reorganizations without any network in play.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use docket_core::{
    sha256_digest, CanonicalBytes, CanonicalizationError, CaseId, ContentDigest, EvidenceCategory,
    EvidenceId, Jurisdiction, LedgerId, LogicalWriteId, OwnerId, Timestamp,
};
use docket_crypto::StorageLocator;

use crate::contract::{BlockContext, CaseRecord, ContractError, EvidenceRecord, RegistryContract};
use crate::event::RegistryEvent;

// ---------------------------------------------------------------------------
// Write payloads
// ---------------------------------------------------------------------------

/// A registry mutation, expressed independently of any ledger.
///
/// The serialized form is what ledgers digest when deriving transaction
/// identifiers, so field order and optionality here are part of the wire
/// contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RegistryOp {
    /// Open a case.
    OpenCase {
        /// Principal that will own the case.
        owner: OwnerId,
        /// Jurisdiction tag for identifier allocation.
        jurisdiction: Jurisdiction,
        /// Fingerprint of the canonical case summary.
        summary_fingerprint: ContentDigest,
        /// Pre-claimed identifier, if the client (or the coordinator,
        /// when replaying the primary's allocation) supplies one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_case_id: Option<CaseId>,
    },
    /// Register an evidence entry on an open case.
    AddEvidence {
        /// Principal submitting the entry. Must own the case.
        caller: OwnerId,
        /// Target case.
        case_id: CaseId,
        /// Identifier of the entry within its case.
        evidence_id: EvidenceId,
        /// Fingerprint of the raw evidence bytes.
        content_fingerprint: ContentDigest,
        /// Where the bytes live in the content-addressed store.
        storage_locator: StorageLocator,
        /// Coarse evidence category.
        category: EvidenceCategory,
        /// Free-text caption.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Close a case.
    CloseCase {
        /// Principal requesting the close. Must own the case.
        caller: OwnerId,
        /// Target case.
        case_id: CaseId,
    },
}

impl RegistryOp {
    /// Operation name, matching the serialized `op` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OpenCase { .. } => "open_case",
            Self::AddEvidence { .. } => "add_evidence",
            Self::CloseCase { .. } => "close_case",
        }
    }

    /// The case this operation targets, when it is known up front.
    ///
    /// An `OpenCase` without a client-supplied identifier returns `None`
    /// until a ledger allocates one.
    pub fn case_id(&self) -> Option<&CaseId> {
        match self {
            Self::OpenCase { client_case_id, .. } => client_case_id.as_ref(),
            Self::AddEvidence { case_id, .. } => Some(case_id),
            Self::CloseCase { case_id, .. } => Some(case_id),
        }
    }

    /// Pin an `OpenCase` to a concrete identifier.
    ///
    /// The coordinator calls this after the primary ledger allocates, so
    /// every redundant ledger replays the same identifier instead of
    /// allocating its own. Operations that already carry a case
    /// identifier are left untouched.
    pub fn pin_case_id(&mut self, pinned: CaseId) {
        if let Self::OpenCase { client_case_id, .. } = self {
            *client_case_id = Some(pinned);
        }
    }
}

/// A logical write: one registry operation plus the identity that makes
/// retries and cross-ledger replays recognizable as the same intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerWrite {
    /// Stable identity of this write across retries and ledgers.
    pub logical_write_id: LogicalWriteId,
    /// The mutation to apply.
    pub op: RegistryOp,
}

impl LedgerWrite {
    /// Wrap an operation with a fresh logical write identity.
    pub fn new(op: RegistryOp) -> Self {
        Self {
            logical_write_id: LogicalWriteId::new(),
            op,
        }
    }
}

// ---------------------------------------------------------------------------
// Receipts and status
// ---------------------------------------------------------------------------

/// Where a write landed on one ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRef {
    /// Ledger that carried the transaction.
    pub ledger_id: LedgerId,
    /// Ledger-assigned transaction identifier.
    pub tx_id: String,
    /// Height of the block that included the transaction.
    pub block_height: u64,
}

/// What a successfully applied operation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OpResult {
    /// A case was opened under the given identifier.
    CaseOpened {
        /// The identifier the ledger allocated or accepted.
        case_id: CaseId,
    },
    /// An evidence entry was registered.
    EvidenceRegistered {
        /// Case holding the entry.
        case_id: CaseId,
        /// The registered entry.
        evidence_id: EvidenceId,
    },
    /// A case was closed.
    CaseClosed {
        /// The closed case.
        case_id: CaseId,
    },
}

impl OpResult {
    /// The case the operation affected.
    pub fn case_id(&self) -> &CaseId {
        match self {
            Self::CaseOpened { case_id }
            | Self::EvidenceRegistered { case_id, .. }
            | Self::CaseClosed { case_id } => case_id,
        }
    }
}

/// Acknowledgement for an accepted write on one ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction placement.
    pub tx: TxRef,
    /// What the operation produced.
    pub result: OpResult,
}

/// Lifecycle of a submitted transaction, as reported by its ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    /// Accepted but not yet confirmed.
    Pending,
    /// Confirmed at its recorded height.
    Confirmed,
    /// Evicted by a chain reorganization. The write never happened as
    /// far as this ledger is concerned.
    Dropped,
}

impl TxStatus {
    /// Canonical lowercase name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Dropped => "dropped",
        }
    }
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a ledger backend.
///
/// [`LedgerError::Rejected`] is a verdict: the contract refused the
/// operation and resubmitting the same bytes will refuse it again. The
/// other variants describe the ledger, not the operation, and
/// [`LedgerError::is_transient`] tells retry loops which ones are worth
/// another attempt.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The registry contract refused the operation.
    #[error("ledger {ledger_id} rejected the write: {source}")]
    Rejected {
        /// Ledger that carried the attempt.
        ledger_id: LedgerId,
        /// The contract's verdict.
        #[source]
        source: ContractError,
    },

    /// The ledger could not be reached or refused service.
    #[error("ledger {ledger_id} is unavailable: {reason}")]
    Unavailable {
        /// The unreachable ledger.
        ledger_id: LedgerId,
        /// Transport-level detail.
        reason: String,
    },

    /// The ledger has no record of the transaction.
    #[error("ledger {ledger_id} has no transaction {tx_id}")]
    UnknownTx {
        /// Ledger that was queried.
        ledger_id: LedgerId,
        /// The unknown identifier.
        tx_id: String,
    },

    /// The write could not be canonicalized for transaction derivation.
    #[error("canonical form of the write could not be produced: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

impl LedgerError {
    /// Whether a retry of the same write could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Extract the contract verdict, if this error carries one.
    pub fn into_rejection(self) -> Option<ContractError> {
        match self {
            Self::Rejected { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// The backend trait
// ---------------------------------------------------------------------------

/// Uniform interface over anything that can carry the registry contract.
///
/// Implementations are free to confirm writes asynchronously: `submit`
/// returning a receipt means the write was accepted into a block, and
/// [`LedgerBackend::tx_status`] reports whether that block is still on
/// the confirmed chain. Readers treat a backend that errors on the read
/// methods as unreachable rather than empty.
pub trait LedgerBackend: Send + Sync {
    /// Identifier of this ledger within a topology.
    fn ledger_id(&self) -> &LedgerId;

    /// Height of the current chain head.
    fn head_height(&self) -> u64;

    /// Submit a write for inclusion.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Rejected`] when the contract refuses the
    /// operation, or [`LedgerError::Unavailable`] when the ledger cannot
    /// take writes right now.
    fn submit(&self, write: &LedgerWrite) -> Result<TxReceipt, LedgerError>;

    /// Report the current status of a previously submitted transaction.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnknownTx`] when the ledger has never seen
    /// the identifier.
    fn tx_status(&self, tx_id: &str) -> Result<TxStatus, LedgerError>;

    /// Read a case record. `Ok(None)` means the ledger is reachable and
    /// the case is not registered on it.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] when the ledger cannot be
    /// queried.
    fn get_case(&self, case_id: &CaseId) -> Result<Option<CaseRecord>, LedgerError>;

    /// Read the evidence entries of a case, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] when the ledger cannot be
    /// queried.
    fn get_evidence(&self, case_id: &CaseId) -> Result<Option<Vec<EvidenceRecord>>, LedgerError>;

    /// Events with sequence numbers strictly greater than `after`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unavailable`] when the ledger cannot be
    /// queried.
    fn events_since(&self, after: u64) -> Result<Vec<RegistryEvent>, LedgerError>;
}

// ---------------------------------------------------------------------------
// In-process reference ledger
// ---------------------------------------------------------------------------

/// A complete single-node ledger hosting the registry contract.
///
/// One accepted write mints one block; the block timestamp is the apply
/// time. Rejected writes consume no height. Fault injection is explicit:
/// nothing fails unless a test asks it to.
///
/// ```
/// use docket_core::{sha256_raw, Jurisdiction, LedgerId, OwnerId};
/// use docket_ledger::{InProcessLedger, LedgerBackend, LedgerWrite, RegistryOp};
///
/// let ledger = InProcessLedger::new(LedgerId::new("primary-a").unwrap());
/// let write = LedgerWrite::new(RegistryOp::OpenCase {
///     owner: OwnerId::new("tenant-7081").unwrap(),
///     jurisdiction: Jurisdiction::new("GA-FULTON").unwrap(),
///     summary_fingerprint: sha256_raw(b"summary"),
///     client_case_id: None,
/// });
/// let receipt = ledger.submit(&write).unwrap();
/// assert_eq!(receipt.tx.block_height, 1);
/// ```
pub struct InProcessLedger {
    ledger_id: LedgerId,
    head: AtomicU64,
    state: RwLock<LedgerInner>,
}

struct LedgerInner {
    contract: RegistryContract,
    /// Accepted writes with their original block contexts, oldest first.
    /// Replayed verbatim when a reorg rolls the chain back.
    log: Vec<AppliedWrite>,
    txs: BTreeMap<String, TxEntry>,
    fail_next: u32,
    hold_confirmations: bool,
    offline: bool,
}

#[derive(Clone)]
struct AppliedWrite {
    ctx: BlockContext,
    write: LedgerWrite,
}

struct TxEntry {
    block_height: u64,
    status: TxStatus,
}

impl InProcessLedger {
    /// Create an empty ledger at height 0.
    pub fn new(ledger_id: LedgerId) -> Self {
        Self {
            ledger_id,
            head: AtomicU64::new(0),
            state: RwLock::new(LedgerInner {
                contract: RegistryContract::new(),
                log: Vec::new(),
                txs: BTreeMap::new(),
                fail_next: 0,
                hold_confirmations: false,
                offline: false,
            }),
        }
    }

    /// Make the next `n` submissions fail with [`LedgerError::Unavailable`].
    ///
    /// Replaces any previously armed count.
    pub fn fail_next_submits(&self, n: u32) {
        self.state.write().fail_next = n;
    }

    /// Take the ledger offline (or back online). While offline, every
    /// submit, status poll, and read returns [`LedgerError::Unavailable`];
    /// state is untouched and serves again once the ledger returns.
    pub fn set_offline(&self, offline: bool) {
        self.state.write().offline = offline;
    }

    fn unavailable(&self, reason: &str) -> LedgerError {
        LedgerError::Unavailable {
            ledger_id: self.ledger_id.clone(),
            reason: reason.into(),
        }
    }

    /// When `hold` is set, accepted writes stay [`TxStatus::Pending`]
    /// until [`InProcessLedger::release_confirmations`] runs.
    pub fn hold_confirmations(&self, hold: bool) {
        self.state.write().hold_confirmations = hold;
    }

    /// Confirm every pending transaction and stop holding new ones.
    pub fn release_confirmations(&self) {
        let mut inner = self.state.write();
        inner.hold_confirmations = false;
        for entry in inner.txs.values_mut() {
            if entry.status == TxStatus::Pending {
                entry.status = TxStatus::Confirmed;
            }
        }
    }

    /// Roll the chain back to `new_head`, dropping every later block.
    ///
    /// Transactions above the new head flip to [`TxStatus::Dropped`] and
    /// contract state is rebuilt by replaying the surviving writes with
    /// their original block contexts, so identifiers and timestamps come
    /// out exactly as first recorded. The event log truncates with the
    /// state it describes.
    pub fn trigger_reorg(&self, new_head: u64) {
        let mut inner = self.state.write();
        let current = self.head.load(Ordering::SeqCst);
        if new_head >= current {
            return;
        }

        for entry in inner.txs.values_mut() {
            if entry.block_height > new_head {
                entry.status = TxStatus::Dropped;
            }
        }

        let survivors: Vec<AppliedWrite> = inner
            .log
            .iter()
            .filter(|applied| applied.ctx.block_height <= new_head)
            .cloned()
            .collect();
        let dropped = inner.log.len() - survivors.len();

        let mut contract = RegistryContract::new();
        for applied in &survivors {
            // Each survivor was accepted once against exactly this
            // prefix of the log, so replay cannot be refused.
            if let Err(err) = apply_op(&mut contract, &applied.ctx, &applied.write.op) {
                tracing::error!(
                    tx_id = %applied.ctx.tx_id,
                    %err,
                    "reorg replay refused a previously accepted write"
                );
            }
        }
        inner.contract = contract;
        inner.log = survivors;
        self.head.store(new_head, Ordering::SeqCst);

        tracing::warn!(
            ledger_id = %self.ledger_id,
            new_head,
            dropped,
            "chain reorganized; later transactions dropped"
        );
    }
}

impl LedgerBackend for InProcessLedger {
    fn ledger_id(&self) -> &LedgerId {
        &self.ledger_id
    }

    fn head_height(&self) -> u64 {
        self.head.load(Ordering::SeqCst)
    }

    fn submit(&self, write: &LedgerWrite) -> Result<TxReceipt, LedgerError> {
        let mut inner = self.state.write();
        if inner.offline {
            return Err(self.unavailable("ledger offline"));
        }
        if inner.fail_next > 0 {
            inner.fail_next -= 1;
            return Err(LedgerError::Unavailable {
                ledger_id: self.ledger_id.clone(),
                reason: "injected submit failure".into(),
            });
        }

        // Rejected writes consume no height, so the candidate height is
        // only published once the contract accepts.
        let height = self.head.load(Ordering::SeqCst) + 1;
        let tx_id = derive_tx_id(&self.ledger_id, height, write)?;
        let ctx = BlockContext::new(height, Timestamp::now(), tx_id.clone());

        let result = apply_op(&mut inner.contract, &ctx, &write.op).map_err(|source| {
            LedgerError::Rejected {
                ledger_id: self.ledger_id.clone(),
                source,
            }
        })?;

        let status = if inner.hold_confirmations {
            TxStatus::Pending
        } else {
            TxStatus::Confirmed
        };
        inner.txs.insert(
            tx_id.clone(),
            TxEntry {
                block_height: height,
                status,
            },
        );
        inner.log.push(AppliedWrite {
            ctx,
            write: write.clone(),
        });
        self.head.store(height, Ordering::SeqCst);

        Ok(TxReceipt {
            tx: TxRef {
                ledger_id: self.ledger_id.clone(),
                tx_id,
                block_height: height,
            },
            result,
        })
    }

    fn tx_status(&self, tx_id: &str) -> Result<TxStatus, LedgerError> {
        let inner = self.state.read();
        if inner.offline {
            return Err(self.unavailable("ledger offline"));
        }
        inner
            .txs
            .get(tx_id)
            .map(|entry| entry.status)
            .ok_or_else(|| LedgerError::UnknownTx {
                ledger_id: self.ledger_id.clone(),
                tx_id: tx_id.to_owned(),
            })
    }

    fn get_case(&self, case_id: &CaseId) -> Result<Option<CaseRecord>, LedgerError> {
        let inner = self.state.read();
        if inner.offline {
            return Err(self.unavailable("ledger offline"));
        }
        Ok(inner.contract.get_case(case_id).cloned())
    }

    fn get_evidence(&self, case_id: &CaseId) -> Result<Option<Vec<EvidenceRecord>>, LedgerError> {
        let inner = self.state.read();
        if inner.offline {
            return Err(self.unavailable("ledger offline"));
        }
        Ok(inner.contract.get_evidence(case_id))
    }

    fn events_since(&self, after: u64) -> Result<Vec<RegistryEvent>, LedgerError> {
        let inner = self.state.read();
        if inner.offline {
            return Err(self.unavailable("ledger offline"));
        }
        Ok(inner.contract.events_since(after))
    }
}

/// Route an operation to the matching contract entry point.
fn apply_op(
    contract: &mut RegistryContract,
    ctx: &BlockContext,
    op: &RegistryOp,
) -> Result<OpResult, ContractError> {
    match op {
        RegistryOp::OpenCase {
            owner,
            jurisdiction,
            summary_fingerprint,
            client_case_id,
        } => {
            let case_id = contract.open_case(
                ctx,
                owner.clone(),
                jurisdiction.clone(),
                summary_fingerprint.clone(),
                client_case_id.clone(),
            )?;
            Ok(OpResult::CaseOpened { case_id })
        }
        RegistryOp::AddEvidence {
            caller,
            case_id,
            evidence_id,
            content_fingerprint,
            storage_locator,
            category,
            description,
        } => {
            contract.add_evidence(
                ctx,
                caller,
                case_id,
                evidence_id.clone(),
                content_fingerprint.clone(),
                storage_locator.clone(),
                *category,
                description.clone(),
            )?;
            Ok(OpResult::EvidenceRegistered {
                case_id: case_id.clone(),
                evidence_id: evidence_id.clone(),
            })
        }
        RegistryOp::CloseCase { caller, case_id } => {
            contract.close_case(ctx, caller, case_id)?;
            Ok(OpResult::CaseClosed {
                case_id: case_id.clone(),
            })
        }
    }
}

/// Derive a transaction identifier from the write's canonical form.
///
/// `tx-{height}-{prefix}` where the prefix is the first 16 hex characters
/// of the digest over (ledger, height, write). Identical content
/// resubmitted at the same height reproduces the same identifier, which
/// is how a re-included transaction reclaims its slot after a reorg.
fn derive_tx_id(
    ledger_id: &LedgerId,
    height: u64,
    write: &LedgerWrite,
) -> Result<String, LedgerError> {
    let body = serde_json::json!({
        "ledger": ledger_id,
        "height": height,
        "write": write,
    });
    let digest = sha256_digest(&CanonicalBytes::new(&body)?);
    Ok(format!("tx-{height}-{}", &digest.to_hex()[..16]))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use docket_core::sha256_raw;

    fn ledger() -> InProcessLedger {
        InProcessLedger::new(LedgerId::new("primary-a").expect("valid ledger id"))
    }

    fn owner() -> OwnerId {
        OwnerId::new("tenant-7081").expect("valid owner")
    }

    fn open_write() -> LedgerWrite {
        LedgerWrite::new(RegistryOp::OpenCase {
            owner: owner(),
            jurisdiction: Jurisdiction::new("GA-FULTON").expect("valid jurisdiction"),
            summary_fingerprint: sha256_raw(b"summary"),
            client_case_id: None,
        })
    }

    fn evidence_write(case_id: &CaseId, label: &str, content: &[u8]) -> LedgerWrite {
        LedgerWrite::new(RegistryOp::AddEvidence {
            caller: owner(),
            case_id: case_id.clone(),
            evidence_id: EvidenceId::new(label).expect("valid id"),
            content_fingerprint: sha256_raw(content),
            storage_locator: StorageLocator::for_digest(sha256_raw(content)),
            category: EvidenceCategory::Photo,
            description: None,
        })
    }

    fn close_write(case_id: &CaseId) -> LedgerWrite {
        LedgerWrite::new(RegistryOp::CloseCase {
            caller: owner(),
            case_id: case_id.clone(),
        })
    }

    fn opened_case(ledger: &InProcessLedger) -> CaseId {
        let receipt = ledger.submit(&open_write()).expect("open accepted");
        receipt.result.case_id().clone()
    }

    // -- Submission ---------------------------------------------------------

    #[test]
    fn submit_mints_one_block_per_write() {
        let ledger = ledger();
        let first = ledger.submit(&open_write()).expect("first write");
        let second = ledger.submit(&open_write()).expect("second write");
        assert_eq!(first.tx.block_height, 1);
        assert_eq!(second.tx.block_height, 2);
        assert_eq!(ledger.head_height(), 2);
    }

    #[test]
    fn submit_confirms_immediately_by_default() {
        let ledger = ledger();
        let receipt = ledger.submit(&open_write()).expect("write accepted");
        assert_eq!(
            ledger.tx_status(&receipt.tx.tx_id).expect("known tx"),
            TxStatus::Confirmed
        );
    }

    #[test]
    fn tx_id_carries_height_and_digest_prefix() {
        let ledger = ledger();
        let receipt = ledger.submit(&open_write()).expect("write accepted");
        assert!(
            receipt.tx.tx_id.starts_with("tx-1-"),
            "unexpected tx id: {}",
            receipt.tx.tx_id
        );
        assert_eq!(receipt.tx.tx_id.len(), "tx-1-".len() + 16);
    }

    #[test]
    fn tx_derivation_is_deterministic_and_ledger_scoped() {
        let id_a = LedgerId::new("primary-a").expect("valid id");
        let id_b = LedgerId::new("redundant-b").expect("valid id");
        let write = open_write();

        let first = derive_tx_id(&id_a, 7, &write).expect("derive");
        let again = derive_tx_id(&id_a, 7, &write).expect("derive");
        let other_ledger = derive_tx_id(&id_b, 7, &write).expect("derive");
        let other_height = derive_tx_id(&id_a, 8, &write).expect("derive");

        assert_eq!(first, again);
        assert_ne!(first, other_ledger);
        assert_ne!(first, other_height);
    }

    #[test]
    fn rejected_write_consumes_no_height() {
        let ledger = ledger();
        let ghost = CaseId::new("GA-FULTON-2025-404").expect("valid id");
        let err = ledger
            .submit(&evidence_write(&ghost, "EXH-A-01", b"x"))
            .unwrap_err();
        assert!(
            matches!(
                &err,
                LedgerError::Rejected {
                    source: ContractError::CaseNotFound(_),
                    ..
                }
            ),
            "expected contract rejection, got: {err:?}"
        );
        assert!(!err.is_transient());
        assert_eq!(ledger.head_height(), 0);
    }

    #[test]
    fn full_case_flow_through_the_trait() {
        let ledger = ledger();
        let backend: &dyn LedgerBackend = &ledger;

        let opened = backend.submit(&open_write()).expect("open");
        let case_id = opened.result.case_id().clone();
        backend
            .submit(&evidence_write(&case_id, "EXH-A-01", b"leak photo"))
            .expect("evidence");
        backend.submit(&close_write(&case_id)).expect("close");

        let record = backend
            .get_case(&case_id)
            .expect("reachable")
            .expect("registered");
        assert!(record.status.is_closed());
        let entries = backend
            .get_evidence(&case_id)
            .expect("reachable")
            .expect("registered");
        assert_eq!(entries.len(), 1);
        let events = backend.events_since(0).expect("reachable");
        assert_eq!(events.len(), 3);
    }

    // -- Fault injection ----------------------------------------------------

    #[test]
    fn injected_failures_exhaust_then_clear() {
        let ledger = ledger();
        ledger.fail_next_submits(2);

        for _ in 0..2 {
            let err = ledger.submit(&open_write()).unwrap_err();
            assert!(err.is_transient(), "expected transient, got: {err:?}");
        }
        ledger.submit(&open_write()).expect("third attempt lands");
        assert_eq!(ledger.head_height(), 1);
    }

    #[test]
    fn held_confirmations_stay_pending_until_released() {
        let ledger = ledger();
        ledger.hold_confirmations(true);

        let receipt = ledger.submit(&open_write()).expect("write accepted");
        assert_eq!(
            ledger.tx_status(&receipt.tx.tx_id).expect("known tx"),
            TxStatus::Pending
        );

        ledger.release_confirmations();
        assert_eq!(
            ledger.tx_status(&receipt.tx.tx_id).expect("known tx"),
            TxStatus::Confirmed
        );

        // Holding was switched off by the release.
        let after = ledger.submit(&open_write()).expect("write accepted");
        assert_eq!(
            ledger.tx_status(&after.tx.tx_id).expect("known tx"),
            TxStatus::Confirmed
        );
    }

    #[test]
    fn tx_status_unknown_transaction() {
        let ledger = ledger();
        let err = ledger.tx_status("tx-9-ffffffffffffffff").unwrap_err();
        assert!(
            matches!(&err, LedgerError::UnknownTx { tx_id, .. } if tx_id == "tx-9-ffffffffffffffff"),
            "expected UnknownTx, got: {err:?}"
        );
    }

    #[test]
    fn offline_ledger_refuses_reads_and_writes_until_restored() {
        let ledger = ledger();
        let receipt = ledger.submit(&open_write()).expect("write accepted");
        let case_id = match receipt.result {
            OpResult::CaseOpened { ref case_id } => case_id.clone(),
            ref other => panic!("expected CaseOpened, got: {other:?}"),
        };

        ledger.set_offline(true);
        assert!(ledger.submit(&open_write()).unwrap_err().is_transient());
        assert!(ledger.tx_status(&receipt.tx.tx_id).unwrap_err().is_transient());
        assert!(ledger.get_case(&case_id).unwrap_err().is_transient());
        assert!(ledger.get_evidence(&case_id).unwrap_err().is_transient());
        assert!(ledger.events_since(0).unwrap_err().is_transient());

        // State survives the outage untouched.
        ledger.set_offline(false);
        assert!(ledger.get_case(&case_id).expect("reachable").is_some());
        assert_eq!(ledger.head_height(), 1);
    }

    // -- Reorganizations ----------------------------------------------------

    #[test]
    fn reorg_drops_transactions_above_the_new_head() {
        let ledger = ledger();
        let case_id = opened_case(&ledger);
        let kept = ledger
            .submit(&evidence_write(&case_id, "EXH-A-01", b"photo one"))
            .expect("kept write");
        let dropped = ledger
            .submit(&evidence_write(&case_id, "EXH-B-02", b"photo two"))
            .expect("dropped write");

        ledger.trigger_reorg(2);

        assert_eq!(ledger.head_height(), 2);
        assert_eq!(
            ledger.tx_status(&kept.tx.tx_id).expect("known"),
            TxStatus::Confirmed
        );
        assert_eq!(
            ledger.tx_status(&dropped.tx.tx_id).expect("known"),
            TxStatus::Dropped
        );
        let entries = ledger
            .get_evidence(&case_id)
            .expect("reachable")
            .expect("registered");
        assert_eq!(entries.len(), 1, "second entry must be rolled back");
    }

    #[test]
    fn reorg_replay_preserves_identifiers_and_timestamps() {
        let ledger = ledger();
        let case_id = opened_case(&ledger);
        let before = ledger
            .get_case(&case_id)
            .expect("reachable")
            .expect("registered");
        ledger
            .submit(&evidence_write(&case_id, "EXH-A-01", b"photo"))
            .expect("evidence");

        ledger.trigger_reorg(1);

        let after = ledger
            .get_case(&case_id)
            .expect("reachable")
            .expect("still registered");
        assert_eq!(after, before);
    }

    #[test]
    fn reorg_truncates_the_event_log() {
        let ledger = ledger();
        let case_id = opened_case(&ledger);
        ledger
            .submit(&evidence_write(&case_id, "EXH-A-01", b"photo"))
            .expect("evidence");
        ledger.submit(&close_write(&case_id)).expect("close");
        assert_eq!(ledger.events_since(0).expect("reachable").len(), 3);

        ledger.trigger_reorg(1);

        let events = ledger.events_since(0).expect("reachable");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 1);
        // The case reverted to open along with its log.
        let record = ledger
            .get_case(&case_id)
            .expect("reachable")
            .expect("registered");
        assert!(!record.status.is_closed());
    }

    #[test]
    fn reorg_to_current_or_higher_head_is_a_noop() {
        let ledger = ledger();
        let case_id = opened_case(&ledger);

        ledger.trigger_reorg(1);
        ledger.trigger_reorg(10);

        assert_eq!(ledger.head_height(), 1);
        assert!(ledger
            .get_case(&case_id)
            .expect("reachable")
            .is_some());
    }

    #[test]
    fn reallocation_after_reorg_reuses_the_sequence() {
        let ledger = ledger();
        let first = opened_case(&ledger);
        let second = opened_case(&ledger);
        assert_ne!(first, second);

        ledger.trigger_reorg(1);
        // The dropped allocation never happened, so the sequence is free
        // again for the next open.
        let reopened = opened_case(&ledger);
        assert_eq!(reopened, second);
    }

    // -- Write payloads -----------------------------------------------------

    #[test]
    fn registry_op_serializes_with_op_tag() {
        let write = open_write();
        let json = serde_json::to_string(&write).expect("serialize write");
        assert!(json.contains("\"op\":\"open_case\""), "tag missing in: {json}");
        assert!(
            !json.contains("client_case_id"),
            "unset identifier must be omitted: {json}"
        );
    }

    #[test]
    fn registry_op_round_trips() {
        let case_id = CaseId::new("GA-FULTON-2025-001").expect("valid id");
        let write = evidence_write(&case_id, "EXH-A-01", b"leak photo");
        let json = serde_json::to_string(&write).expect("serialize write");
        let recovered: LedgerWrite = serde_json::from_str(&json).expect("deserialize write");
        assert_eq!(recovered, write);
    }

    #[test]
    fn pin_case_id_targets_only_open_case() {
        let pinned = CaseId::new("GA-FULTON-2025-001").expect("valid id");

        let mut open = open_write();
        assert!(open.op.case_id().is_none());
        open.op.pin_case_id(pinned.clone());
        assert_eq!(open.op.case_id(), Some(&pinned));

        let other = CaseId::new("GA-FULTON-2025-002").expect("valid id");
        let mut close = close_write(&other);
        close.op.pin_case_id(pinned);
        assert_eq!(close.op.case_id(), Some(&other));
    }

    #[test]
    fn op_kind_matches_serialized_tag() {
        let case_id = CaseId::new("GA-FULTON-2025-001").expect("valid id");
        for write in [
            open_write(),
            evidence_write(&case_id, "EXH-A-01", b"x"),
            close_write(&case_id),
        ] {
            let value = serde_json::to_value(&write.op).expect("serialize op");
            assert_eq!(value["op"], write.op.kind());
        }
    }

    // -- Trait object safety ------------------------------------------------

    #[test]
    fn ledger_backend_is_object_safe() {
        // Topologies hold backends behind dynamic dispatch.
        let backends: Vec<Box<dyn LedgerBackend>> = vec![
            Box::new(InProcessLedger::new(
                LedgerId::new("primary-a").expect("valid id"),
            )),
            Box::new(InProcessLedger::new(
                LedgerId::new("redundant-b").expect("valid id"),
            )),
        ];
        let names: Vec<&str> = backends
            .iter()
            .map(|backend| backend.ledger_id().as_str())
            .collect();
        assert_eq!(names, vec!["primary-a", "redundant-b"]);
    }

    // -- Errors -------------------------------------------------------------

    #[test]
    fn error_display_names_the_ledger() {
        let err = LedgerError::Unavailable {
            ledger_id: LedgerId::new("redundant-b").expect("valid id"),
            reason: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("redundant-b"), "ledger missing in: {msg}");
        assert!(msg.contains("connection refused"), "reason missing in: {msg}");
    }

    #[test]
    fn rejection_unwraps_to_the_contract_verdict() {
        let case_id = CaseId::new("GA-FULTON-2025-001").expect("valid id");
        let err = LedgerError::Rejected {
            ledger_id: LedgerId::new("primary-a").expect("valid id"),
            source: ContractError::CaseClosed(case_id.clone()),
        };
        assert_eq!(err.into_rejection(), Some(ContractError::CaseClosed(case_id)));

        let transient = LedgerError::Unavailable {
            ledger_id: LedgerId::new("primary-a").expect("valid id"),
            reason: "down".into(),
        };
        assert_eq!(transient.into_rejection(), None);
    }
}
