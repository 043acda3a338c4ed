#![deny(missing_docs)]

//! # docket-core — Foundational Types for the Docket Registry
//!
//! This crate defines the foundational types that every other crate in the
//! workspace depends on. It has no internal crate dependencies — only `serde`,
//! `serde_json`, `thiserror`, `chrono`, `uuid`, and `sha2` from the external
//! ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type. You cannot pass an [`EvidenceId`] where a [`CaseId`] is
//!    expected, and malformed identifiers are rejected at construction.
//!
//! 2. **[`CanonicalBytes`] is the sole path to fingerprint computation for
//!    structured data.** Every summary fingerprint in the registry flows
//!    through `CanonicalBytes::new()`, which applies JCS-compatible
//!    canonicalization (float rejection, datetime normalization, sorted keys)
//!    so that two logically identical summaries always fingerprint
//!    identically regardless of producing system.
//!
//! 3. **Evidence files are fingerprinted verbatim.** [`sha256_raw()`] hashes
//!    the exact bytes of a file; there is no canonicalization step for
//!    opaque content. The two paths never mix.
//!
//! 4. **[`DocketError`] hierarchy.** Structured errors with `thiserror` — no
//!    `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod summary;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_raw, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, DocketError, ValidationError};
pub use identity::{CaseId, EvidenceId, Jurisdiction, LedgerId, LogicalWriteId, OwnerId};
pub use summary::{CaseSummary, EvidenceCategory};
pub use temporal::Timestamp;
