//! # docket-ledger — Registry Contract and Ledger Backends
//!
//! The write side of the registry, split into three layers:
//!
//! - **Contract** ([`contract`]): the deterministic case-and-evidence
//!   state machine. Opens cases, registers evidence, closes cases, and
//!   allocates `{jurisdiction}-{year}-{seq:03}` identifiers, taking all
//!   timing from the block that carries each write.
//!
//! - **Events** ([`event`]): the append-only change feed every accepted
//!   mutation appends to, with dense sequence numbers for resumable
//!   polling.
//!
//! - **Backends** ([`backend`]): the object-safe [`LedgerBackend`] trait
//!   the coordinator fans writes out over, plus [`InProcessLedger`], a
//!   single-node ledger with fault injection for exercising retry,
//!   confirmation, and reorganization handling without a network.

pub mod backend;
pub mod contract;
pub mod event;

// Re-export primary types.
pub use backend::{
    InProcessLedger, LedgerBackend, LedgerError, LedgerWrite, OpResult, RegistryOp, TxReceipt,
    TxRef, TxStatus,
};
pub use contract::{
    BlockContext, CaseRecord, CaseStatus, ContractError, EvidenceRecord, RegistryContract,
};
pub use event::{EventKind, RegistryEvent};
