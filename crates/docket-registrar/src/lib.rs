//! # docket-registrar — Intake and Receipts
//!
//! The write side of the registry. The registrar is the only component
//! that submits to any ledger: it validates intake, stores evidence
//! bytes, fingerprints everything locally, and drives the multi-ledger
//! write coordinator. Every successful mutation returns a signed receipt.
//!
//! - **[`registrar`]** — the [`Registrar`] service: case registration,
//!   evidence registration with the store-then-verify round trip, and
//!   case closure.
//! - **[`receipt`]** — signed receipt types and the Ed25519 attestation
//!   that binds each receipt to this registrar's DID.
//! - **[`journal`]** — append-only JSON-lines record of settled writes,
//!   kept as a recovery aid beside the ledgers.

pub mod journal;
pub mod receipt;
pub mod registrar;

// Re-export primary types.
pub use journal::{JournalEntry, JournalError, WriteJournal};
pub use receipt::{
    registrar_did, AttestationError, AttestedReceipt, CaseReceipt, CloseReceipt, EvidenceReceipt,
    ReceiptAttestation,
};
pub use registrar::{CaseIntake, EvidenceIntake, Registrar, RegistrarError};
