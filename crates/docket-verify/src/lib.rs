//! # docket-verify — Independent Verification
//!
//! The read side of the registry, for anyone who holds a file and wants
//! to know whether the ledgers vouch for it. No write credentials, no
//! registrar dependency: fingerprints are recomputed locally and checked
//! against every configured ledger in constant time.
//!
//! - **[`verifier`]** — [`VerificationReader`] over per-ledger
//!   [`ReaderHandle`]s, producing a [`VerificationResult`] with
//!   per-ledger confirmations, explorer links, and a one-word verdict.

pub mod verifier;

// Re-export primary types.
pub use verifier::{
    LedgerConfirmation, ReaderHandle, VerificationReader, VerificationResult, VerificationVerdict,
};
