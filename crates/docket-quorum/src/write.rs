//! # Write Records — One Logical Write Across N Ledgers
//!
//! A logical write is a single registry mutation tracked per ledger: the
//! same operation lands on the primary and on every redundant ledger, and
//! the [`LedgerWriteRecord`] remembers how far it got on each. Partial
//! confirmation is a first-class state — the record exists precisely so
//! that "registered on the primary, still catching up elsewhere" is
//! visible instead of collapsed into success or failure.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use docket_core::{LedgerId, LogicalWriteId};
use docket_ledger::{LedgerWrite, OpResult, TxRef};

use crate::policy::QuorumPolicy;

/// Progress of one logical write on one ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStatus {
    /// Submitted (or about to be) and not yet confirmed.
    Pending,
    /// Confirmed on this ledger.
    Confirmed,
    /// Gave up after exhausting retries, or the ledger refused the write.
    Failed,
    /// Dropped by a reorganization and not recoverable by resubmission.
    ReorgInvalidated,
}

impl WriteStatus {
    /// Canonical name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::ReorgInvalidated => "reorg_invalidated",
        }
    }
}

impl std::fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The coordinator's bookkeeping for one logical write.
///
/// Holds the written operation itself (in its pinned form, so refresh can
/// resubmit it verbatim), the per-ledger progress, and the transaction
/// references gathered so far. `durable` is re-derived from the statuses
/// whenever they change; it is never set directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerWriteRecord {
    /// Identity of the logical write across ledgers and retries.
    pub logical_write_id: LogicalWriteId,
    /// The submitted write, with any primary-allocated identifier pinned.
    pub write: LedgerWrite,
    /// Ledger that carries the authoritative copy.
    pub primary_ledger: LedgerId,
    /// Progress per ledger, primary included.
    pub per_ledger_status: BTreeMap<LedgerId, WriteStatus>,
    /// Transaction placement per ledger, as submissions land.
    pub per_ledger_tx: BTreeMap<LedgerId, TxRef>,
    /// Ledgers that already used their single post-reorg resubmission.
    pub resubmitted: BTreeSet<LedgerId>,
    /// Whether the quorum policy is currently met.
    pub durable: bool,
}

impl LedgerWriteRecord {
    /// Start tracking a write: every ledger begins [`WriteStatus::Pending`].
    pub fn new(
        write: LedgerWrite,
        primary_ledger: LedgerId,
        redundant_ledgers: impl IntoIterator<Item = LedgerId>,
    ) -> Self {
        let mut per_ledger_status = BTreeMap::new();
        per_ledger_status.insert(primary_ledger.clone(), WriteStatus::Pending);
        for ledger in redundant_ledgers {
            per_ledger_status.insert(ledger, WriteStatus::Pending);
        }
        Self {
            logical_write_id: write.logical_write_id.clone(),
            write,
            primary_ledger,
            per_ledger_status,
            per_ledger_tx: BTreeMap::new(),
            resubmitted: BTreeSet::new(),
            durable: false,
        }
    }

    /// Record progress on one ledger.
    pub fn mark(&mut self, ledger_id: &LedgerId, status: WriteStatus) {
        self.per_ledger_status.insert(ledger_id.clone(), status);
    }

    /// Record where the write landed on its ledger.
    pub fn set_tx(&mut self, tx: TxRef) {
        self.per_ledger_tx.insert(tx.ledger_id.clone(), tx);
    }

    /// Whether the primary ledger has confirmed.
    pub fn primary_confirmed(&self) -> bool {
        self.per_ledger_status.get(&self.primary_ledger) == Some(&WriteStatus::Confirmed)
    }

    /// Number of redundant ledgers currently confirmed.
    pub fn confirmed_redundants(&self) -> usize {
        self.per_ledger_status
            .iter()
            .filter(|(ledger, status)| {
                **ledger != self.primary_ledger && **status == WriteStatus::Confirmed
            })
            .count()
    }

    /// Whether any redundant ledger fell behind: failed, dropped, or
    /// still pending while the write as a whole has settled.
    pub fn is_degraded(&self) -> bool {
        self.per_ledger_status
            .iter()
            .any(|(ledger, status)| {
                *ledger != self.primary_ledger && *status != WriteStatus::Confirmed
            })
    }

    /// Re-derive `durable` from the current statuses.
    pub fn update_durability(&mut self, policy: &QuorumPolicy) {
        self.durable = policy.is_durable(self.primary_confirmed(), self.confirmed_redundants());
    }
}

/// What the coordinator hands back for a completed submission.
///
/// `primary` and `result` come from the authoritative ledger; `degraded`
/// flags that at least one redundant ledger did not confirm, which is an
/// operational warning rather than a failure of the write itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// Identity of the logical write.
    pub logical_write_id: LogicalWriteId,
    /// Where the write landed on the primary ledger.
    pub primary: TxRef,
    /// What the operation produced on the primary.
    pub result: OpResult,
    /// Whether the quorum policy was met.
    pub durable: bool,
    /// Whether any redundant ledger fell behind.
    pub degraded: bool,
    /// Full per-ledger bookkeeping at completion time.
    pub record: LedgerWriteRecord,
}
