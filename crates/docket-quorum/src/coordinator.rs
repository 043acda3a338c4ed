//! # Write Coordinator — Primary First, Then Fan Out
//!
//! Every registry mutation goes through one [`Coordinator::submit`] call,
//! which drives the write across the whole topology:
//!
//! 1. A [`LedgerWriteRecord`] is created with every ledger `Pending`,
//!    before anything touches the wire.
//! 2. The write goes to the primary ledger, with bounded retries on
//!    transient failure, and the coordinator waits for confirmation. A
//!    primary that rejects or never confirms fails the whole write.
//! 3. Any identifier the primary allocated is pinned into the operation,
//!    so redundant ledgers replay the same identifier instead of
//!    allocating their own.
//! 4. One task per redundant ledger submits the pinned write with the
//!    same retry schedule. A redundant that exhausts its retries marks
//!    the write degraded; it never fails it.
//!
//! Reorg recovery is pull-based: [`Coordinator::refresh`] re-polls every
//! recorded transaction, resubmits a dropped redundant transaction once,
//! and escalates to [`WriteStatus::ReorgInvalidated`] when that single
//! resubmission does not stick. A dropped primary transaction is never
//! resubmitted automatically; the record is marked and an operator
//! decides.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use docket_core::{LedgerId, LogicalWriteId};
use docket_ledger::{
    LedgerBackend, LedgerError, LedgerWrite, RegistryOp, TxReceipt, TxRef, TxStatus,
};

use crate::policy::{QuorumPolicy, RetryConfig};
use crate::topology::LedgerTopology;
use crate::write::{LedgerWriteRecord, WriteOutcome, WriteStatus};

type RecordMap = BTreeMap<LogicalWriteId, LedgerWriteRecord>;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation for an in-flight submission.
///
/// Cancellation is only honored up to the moment the primary ledger
/// confirms. After that the write exists with legal effect, so a cancel
/// merely suppresses the redundant fan-out.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// A fresh, un-cancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the coordinated write path.
///
/// These cover only the primary ledger: redundant ledgers degrade the
/// write instead of failing it.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The primary ledger rejected the write or stayed unavailable
    /// through every retry.
    #[error("primary ledger write failed: {0}")]
    PrimaryWriteFailed(#[source] LedgerError),

    /// The primary accepted the write but never confirmed it within the
    /// polling budget. The transaction reference stays in the record, so
    /// a later [`Coordinator::refresh`] can still settle it.
    #[error("primary transaction {tx_id} was not confirmed (last status: {status})")]
    PrimaryUnconfirmed {
        /// The unconfirmed transaction.
        tx_id: String,
        /// The last status the primary reported.
        status: TxStatus,
    },

    /// The submission was cancelled before the primary confirmed.
    #[error("write cancelled before the primary ledger confirmed")]
    Cancelled,

    /// No record of the given logical write.
    #[error("no record of logical write {0}")]
    UnknownWrite(LogicalWriteId),
}

// ---------------------------------------------------------------------------
// The coordinator
// ---------------------------------------------------------------------------

/// Drives registry writes across a [`LedgerTopology`] and tracks their
/// per-ledger progress.
///
/// The record map is shared with the fan-out tasks behind a
/// [`parking_lot::Mutex`]; the lock is only ever held for map updates,
/// never across an await point.
pub struct Coordinator {
    topology: Arc<LedgerTopology>,
    policy: QuorumPolicy,
    retry: RetryConfig,
    records: Arc<Mutex<RecordMap>>,
}

impl Coordinator {
    /// Create a coordinator over a topology.
    pub fn new(topology: Arc<LedgerTopology>, policy: QuorumPolicy, retry: RetryConfig) -> Self {
        Self {
            topology,
            policy,
            retry,
            records: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// The topology this coordinator writes to.
    pub fn topology(&self) -> &Arc<LedgerTopology> {
        &self.topology
    }

    /// The durability policy in force.
    pub fn policy(&self) -> QuorumPolicy {
        self.policy
    }

    /// Submit a registry operation to the whole topology.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::PrimaryWriteFailed`] when the primary
    /// rejects or stays unavailable, and
    /// [`CoordinatorError::PrimaryUnconfirmed`] when it accepts but never
    /// confirms.
    pub async fn submit(&self, op: RegistryOp) -> Result<WriteOutcome, CoordinatorError> {
        self.submit_with_cancel(op, &CancelHandle::new()).await
    }

    /// Submit with an external cancellation handle.
    ///
    /// # Errors
    ///
    /// As [`Coordinator::submit`], plus [`CoordinatorError::Cancelled`]
    /// when the handle fires before the primary confirms.
    pub async fn submit_with_cancel(
        &self,
        op: RegistryOp,
        cancel: &CancelHandle,
    ) -> Result<WriteOutcome, CoordinatorError> {
        let mut write = LedgerWrite::new(op);
        let logical_write_id = write.logical_write_id.clone();
        let primary = self.topology.primary();
        let primary_id = primary.ledger_id().clone();

        // Record first: if the process dies mid-write, the bookkeeping
        // still names every ledger this write was headed for.
        {
            let record = LedgerWriteRecord::new(
                write.clone(),
                primary_id.clone(),
                self.topology
                    .redundants()
                    .iter()
                    .map(|backend| backend.ledger_id().clone()),
            );
            self.records.lock().insert(logical_write_id.clone(), record);
        }

        let receipt = match self.submit_primary(primary, &write, cancel).await {
            Ok(receipt) => receipt,
            Err(err) => {
                self.fail_unfinished(&logical_write_id);
                return Err(err);
            }
        };
        {
            let mut records = self.records.lock();
            if let Some(record) = records.get_mut(&logical_write_id) {
                record.set_tx(receipt.tx.clone());
            }
        }

        if let Err(err) = self
            .await_primary_confirmation(primary, &receipt.tx.tx_id, cancel)
            .await
        {
            self.fail_unfinished(&logical_write_id);
            return Err(err);
        }

        // The primary may have allocated the case identifier; every
        // redundant ledger must register under the same one.
        write.op.pin_case_id(receipt.result.case_id().clone());
        {
            let mut records = self.records.lock();
            if let Some(record) = records.get_mut(&logical_write_id) {
                record.mark(&primary_id, WriteStatus::Confirmed);
                record.write = write.clone();
                record.update_durability(&self.policy);
            }
        }

        if cancel.is_cancelled() {
            tracing::warn!(
                logical_write_id = %logical_write_id,
                "write cancelled after primary confirmation; skipping redundant fan-out"
            );
            self.fail_unfinished(&logical_write_id);
        } else {
            let mut handles = Vec::new();
            for backend in self.topology.redundants() {
                handles.push(tokio::spawn(submit_redundant(
                    Arc::clone(backend),
                    write.clone(),
                    self.retry,
                    cancel.clone(),
                    Arc::clone(&self.records),
                    self.policy,
                )));
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::warn!("redundant submission task failed: {e}");
                }
            }
        }

        let record = {
            let mut records = self.records.lock();
            let record = records
                .get_mut(&logical_write_id)
                .ok_or_else(|| CoordinatorError::UnknownWrite(logical_write_id.clone()))?;
            record.update_durability(&self.policy);
            record.clone()
        };

        let degraded = record.is_degraded();
        if degraded {
            tracing::warn!(
                logical_write_id = %logical_write_id,
                confirmed = record.confirmed_redundants(),
                required = self.policy.redundant_required,
                "write degraded: primary confirmed but redundant quorum not met"
            );
        }

        Ok(WriteOutcome {
            logical_write_id,
            primary: receipt.tx,
            result: receipt.result,
            durable: record.durable,
            degraded,
            record,
        })
    }

    /// Snapshot of one write's bookkeeping.
    pub fn record(&self, logical_write_id: &LogicalWriteId) -> Option<LedgerWriteRecord> {
        self.records.lock().get(logical_write_id).cloned()
    }

    /// Snapshot of every tracked write, ordered by logical write id.
    pub fn records(&self) -> Vec<LedgerWriteRecord> {
        self.records.lock().values().cloned().collect()
    }

    /// Re-poll every recorded transaction of one write and reconcile the
    /// record with what the ledgers report now.
    ///
    /// A dropped redundant transaction is resubmitted exactly once per
    /// ledger; a second drop, or a failed resubmission, marks the ledger
    /// [`WriteStatus::ReorgInvalidated`]. A dropped primary transaction
    /// is only marked, never resubmitted.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::UnknownWrite`] when the id was never
    /// submitted through this coordinator.
    pub fn refresh(
        &self,
        logical_write_id: &LogicalWriteId,
    ) -> Result<LedgerWriteRecord, CoordinatorError> {
        let (write, txs, resubmitted, primary_id) = {
            let records = self.records.lock();
            let record = records
                .get(logical_write_id)
                .ok_or_else(|| CoordinatorError::UnknownWrite(logical_write_id.clone()))?;
            (
                record.write.clone(),
                record.per_ledger_tx.clone(),
                record.resubmitted.clone(),
                record.primary_ledger.clone(),
            )
        };

        // Poll and resubmit without the lock; ledgers may be slow.
        let mut updates: Vec<Update> = Vec::new();
        for (ledger_id, tx) in &txs {
            let Some(backend) = self.topology.get(ledger_id) else {
                continue;
            };
            match backend.tx_status(&tx.tx_id) {
                Ok(TxStatus::Confirmed) => {
                    updates.push(Update::status(ledger_id, WriteStatus::Confirmed));
                }
                Ok(TxStatus::Pending) => {
                    updates.push(Update::status(ledger_id, WriteStatus::Pending));
                }
                Ok(TxStatus::Dropped) if *ledger_id == primary_id => {
                    tracing::warn!(
                        ledger = %ledger_id,
                        tx_id = %tx.tx_id,
                        "primary transaction dropped by a reorg; operator intervention required"
                    );
                    updates.push(Update::status(ledger_id, WriteStatus::ReorgInvalidated));
                }
                Ok(TxStatus::Dropped) if resubmitted.contains(ledger_id) => {
                    tracing::warn!(
                        ledger = %ledger_id,
                        tx_id = %tx.tx_id,
                        "redundant transaction dropped again after its one resubmission"
                    );
                    updates.push(Update::status(ledger_id, WriteStatus::ReorgInvalidated));
                }
                Ok(TxStatus::Dropped) => match backend.submit(&write) {
                    Ok(receipt) => {
                        let status = match backend.tx_status(&receipt.tx.tx_id) {
                            Ok(TxStatus::Confirmed) => WriteStatus::Confirmed,
                            _ => WriteStatus::Pending,
                        };
                        updates.push(Update {
                            ledger_id: ledger_id.clone(),
                            status,
                            tx: Some(receipt.tx),
                            used_resubmission: true,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(ledger = %ledger_id, "post-reorg resubmission failed: {e}");
                        updates.push(Update {
                            ledger_id: ledger_id.clone(),
                            status: WriteStatus::ReorgInvalidated,
                            tx: None,
                            used_resubmission: true,
                        });
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        ledger = %ledger_id,
                        tx_id = %tx.tx_id,
                        "status poll failed, leaving recorded status in place: {e}"
                    );
                }
            }
        }

        let mut records = self.records.lock();
        let record = records
            .get_mut(logical_write_id)
            .ok_or_else(|| CoordinatorError::UnknownWrite(logical_write_id.clone()))?;
        for update in updates {
            record.mark(&update.ledger_id, update.status);
            if let Some(tx) = update.tx {
                record.set_tx(tx);
            }
            if update.used_resubmission {
                record.resubmitted.insert(update.ledger_id);
            }
        }
        record.update_durability(&self.policy);
        Ok(record.clone())
    }

    /// Submit to the primary with the shared retry schedule.
    async fn submit_primary(
        &self,
        primary: &Arc<dyn LedgerBackend>,
        write: &LedgerWrite,
        cancel: &CancelHandle,
    ) -> Result<TxReceipt, CoordinatorError> {
        for attempt in 0..self.retry.max_retries {
            if cancel.is_cancelled() {
                return Err(CoordinatorError::Cancelled);
            }
            match primary.submit(write) {
                Ok(receipt) => return Ok(receipt),
                Err(e) if e.is_transient() => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        ledger = %primary.ledger_id(),
                        attempt = attempt + 1,
                        "primary submission failed, retrying in {delay:?}: {e}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(CoordinatorError::PrimaryWriteFailed(e)),
            }
        }
        if cancel.is_cancelled() {
            return Err(CoordinatorError::Cancelled);
        }
        primary
            .submit(write)
            .map_err(CoordinatorError::PrimaryWriteFailed)
    }

    /// Poll the primary until the transaction confirms or the budget runs
    /// out.
    async fn await_primary_confirmation(
        &self,
        primary: &Arc<dyn LedgerBackend>,
        tx_id: &str,
        cancel: &CancelHandle,
    ) -> Result<(), CoordinatorError> {
        let mut last = TxStatus::Pending;
        for attempt in 0..=self.retry.max_retries {
            if cancel.is_cancelled() {
                return Err(CoordinatorError::Cancelled);
            }
            match primary.tx_status(tx_id) {
                Ok(TxStatus::Confirmed) => return Ok(()),
                Ok(status) => {
                    last = status;
                    // A dropped transaction will not come back on its own.
                    if status == TxStatus::Dropped {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(tx_id, "primary confirmation poll failed: {e}");
                }
            }
            if attempt < self.retry.max_retries {
                tokio::time::sleep(self.retry.delay_for(attempt)).await;
            }
        }
        Err(CoordinatorError::PrimaryUnconfirmed {
            tx_id: tx_id.to_owned(),
            status: last,
        })
    }

    /// Mark every ledger still `Pending` as `Failed`.
    ///
    /// Runs on the fatal paths. Transaction references already recorded
    /// are kept, so [`Coordinator::refresh`] can still revive a write the
    /// ledger settles later.
    fn fail_unfinished(&self, logical_write_id: &LogicalWriteId) {
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(logical_write_id) {
            let pending: Vec<LedgerId> = record
                .per_ledger_status
                .iter()
                .filter(|(_, status)| **status == WriteStatus::Pending)
                .map(|(ledger, _)| ledger.clone())
                .collect();
            for ledger in pending {
                record.mark(&ledger, WriteStatus::Failed);
            }
            record.update_durability(&self.policy);
        }
    }
}

/// One reconciliation step produced by [`Coordinator::refresh`].
struct Update {
    ledger_id: LedgerId,
    status: WriteStatus,
    tx: Option<TxRef>,
    used_resubmission: bool,
}

impl Update {
    fn status(ledger_id: &LedgerId, status: WriteStatus) -> Self {
        Self {
            ledger_id: ledger_id.clone(),
            status,
            tx: None,
            used_resubmission: false,
        }
    }
}

/// Fan-out task: submit the pinned write to one redundant ledger.
async fn submit_redundant(
    backend: Arc<dyn LedgerBackend>,
    write: LedgerWrite,
    retry: RetryConfig,
    cancel: CancelHandle,
    records: Arc<Mutex<RecordMap>>,
    policy: QuorumPolicy,
) {
    let ledger_id = backend.ledger_id().clone();
    for attempt in 0..retry.max_retries {
        if cancel.is_cancelled() {
            mark_failed(&records, &write.logical_write_id, &ledger_id, &policy);
            return;
        }
        match backend.submit(&write) {
            Ok(receipt) => {
                record_receipt(&records, backend.as_ref(), receipt, &write.logical_write_id, &policy);
                return;
            }
            Err(e) if e.is_transient() => {
                let delay = retry.delay_for(attempt);
                tracing::warn!(
                    ledger = %ledger_id,
                    attempt = attempt + 1,
                    "redundant submission failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::warn!(ledger = %ledger_id, "redundant submission rejected: {e}");
                mark_failed(&records, &write.logical_write_id, &ledger_id, &policy);
                return;
            }
        }
    }
    match backend.submit(&write) {
        Ok(receipt) => {
            record_receipt(&records, backend.as_ref(), receipt, &write.logical_write_id, &policy);
        }
        Err(e) => {
            tracing::warn!(ledger = %ledger_id, "redundant submission exhausted its retries: {e}");
            mark_failed(&records, &write.logical_write_id, &ledger_id, &policy);
        }
    }
}

/// Record an accepted redundant submission, checking whether the ledger
/// already confirmed it or is still holding it pending.
fn record_receipt(
    records: &Mutex<RecordMap>,
    backend: &dyn LedgerBackend,
    receipt: TxReceipt,
    logical_write_id: &LogicalWriteId,
    policy: &QuorumPolicy,
) {
    let status = match backend.tx_status(&receipt.tx.tx_id) {
        Ok(TxStatus::Confirmed) => WriteStatus::Confirmed,
        _ => WriteStatus::Pending,
    };
    let mut records = records.lock();
    if let Some(record) = records.get_mut(logical_write_id) {
        record.mark(backend.ledger_id(), status);
        record.set_tx(receipt.tx);
        record.update_durability(policy);
    }
}

fn mark_failed(
    records: &Mutex<RecordMap>,
    logical_write_id: &LogicalWriteId,
    ledger_id: &LedgerId,
    policy: &QuorumPolicy,
) {
    let mut records = records.lock();
    if let Some(record) = records.get_mut(logical_write_id) {
        record.mark(ledger_id, WriteStatus::Failed);
        record.update_durability(policy);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
