//! # Identity Newtypes
//!
//! Domain-primitive newtypes for identifiers throughout the docket registry.
//! Each identifier is a distinct type — you cannot pass an [`EvidenceId`]
//! where a [`CaseId`] is expected.
//!
//! ## Validation
//!
//! String-based identifiers ([`CaseId`], [`EvidenceId`], [`OwnerId`],
//! [`LedgerId`], [`Jurisdiction`]) validate format at construction time.
//! The UUID-based [`LogicalWriteId`] is always valid by construction.
//!
//! ## Formats
//!
//! - Case id: registrar-allocated `<JURISDICTION>-<YEAR>-<SEQ>` (e.g.
//!   `KHI-2025-001`), charset `[A-Za-z0-9-]`, max 64 chars
//! - Evidence id: caller-supplied or registrar-allocated `EV-<12 hex>`,
//!   same charset as case ids
//! - Ledger id: lowercase config key (e.g. `civic-main`), used in topology
//!   files and explorer links

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::ContentDigest;
use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// String-based identifiers (validated at construction)
// ---------------------------------------------------------------------------

/// A registry case identifier.
///
/// Allocated per jurisdiction as `<JURISDICTION>-<YEAR>-<SEQ>` with a
/// zero-padded three-digit sequence (e.g. `KHI-2025-001`). Identifiers are
/// never reused; an allocation that would collide with an existing case
/// skips forward to the next free sequence number.
///
/// # Validation
///
/// - 1 to 64 characters
/// - ASCII letters, digits, and `-` only
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaseId(String);

impl CaseId {
    /// Create a case identifier from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCaseId`] if the string is empty,
    /// longer than 64 characters, or contains characters outside
    /// `[A-Za-z0-9-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty()
            || s.len() > 64
            || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ValidationError::InvalidCaseId(s));
        }
        Ok(Self(s))
    }

    /// Compose an allocated case identifier from its parts.
    ///
    /// Registry-allocated identifiers take the form
    /// `{jurisdiction}-{year}-{seq:03}`, e.g. `GA-FULTON-2025-001`. The
    /// jurisdiction tag is already validated, and the numeric parts only
    /// contribute digits, so the composed form always satisfies the case
    /// identifier constraints without re-validation.
    pub fn from_parts(jurisdiction: &Jurisdiction, year: i32, sequence: u64) -> Self {
        Self(format!("{jurisdiction}-{year}-{sequence:03}"))
    }

    /// Access the case identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An evidence item identifier, unique within its case.
///
/// Callers may supply their own identifier; when they do not, the registrar
/// allocates `EV-<12 hex chars>` from the file fingerprint.
///
/// # Validation
///
/// - 1 to 64 characters
/// - ASCII letters, digits, and `-` only
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EvidenceId(String);

impl EvidenceId {
    /// Create an evidence identifier from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEvidenceId`] if the string is
    /// empty, longer than 64 characters, or contains characters outside
    /// `[A-Za-z0-9-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty()
            || s.len() > 64
            || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ValidationError::InvalidEvidenceId(s));
        }
        Ok(Self(s))
    }

    /// Derive a default evidence identifier from a content fingerprint.
    ///
    /// Used when the submitter does not supply an exhibit label: the
    /// identifier is `EV-` followed by the first twelve hex characters of
    /// the content digest, which keeps identical content mapping to the
    /// same identifier.
    pub fn from_digest(digest: &ContentDigest) -> Self {
        Self(format!("EV-{}", &digest.to_hex()[..12]))
    }

    /// Access the evidence identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The party that opened a case and may attach evidence or close it.
///
/// Opaque to the registry: an owner id may be a DID, an account handle, or
/// a key fingerprint. The contract compares owner ids for equality and
/// nothing else.
///
/// # Validation
///
/// - 1 to 128 characters
/// - No whitespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an owner identifier from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidOwnerId`] if the string is empty,
    /// longer than 128 characters, or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.len() > 128 || s.chars().any(|c| c.is_whitespace()) {
            return Err(ValidationError::InvalidOwnerId(s));
        }
        Ok(Self(s))
    }

    /// Access the owner identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A configured ledger's identifier, as named in the topology file.
///
/// Appears in per-ledger status maps, receipts, and explorer links, so the
/// charset is restricted to lowercase config-key form.
///
/// # Validation
///
/// - 1 to 64 characters
/// - ASCII lowercase letters, digits, and `-` only
/// - First character must be alphanumeric
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerId(String);

impl LedgerId {
    /// Create a ledger identifier from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLedgerId`] if the string is empty,
    /// longer than 64 characters, starts with `-`, or contains characters
    /// outside `[a-z0-9-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let starts_alphanumeric = s.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
        if s.is_empty()
            || s.len() > 64
            || !starts_alphanumeric
            || !s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValidationError::InvalidLedgerId(s));
        }
        Ok(Self(s))
    }

    /// Access the ledger identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LedgerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A jurisdiction tag used as the first segment of allocated case ids.
///
/// # Validation
///
/// - 1 to 48 characters, so allocated case ids stay within the 64-char limit
/// - ASCII letters, digits, and `-` only
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Jurisdiction(String);

impl Jurisdiction {
    /// Create a jurisdiction tag from a string, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidJurisdiction`] if the string is
    /// empty, longer than 48 characters, or contains characters outside
    /// `[A-Za-z0-9-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty()
            || s.len() > 48
            || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ValidationError::InvalidJurisdiction(s));
        }
        Ok(Self(s))
    }

    /// Access the jurisdiction tag string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// UUID-based identifiers (always valid by construction)
// ---------------------------------------------------------------------------

/// A unique identifier for one logical registry write.
///
/// A single intake operation produces one logical write, fanned out to every
/// configured ledger. The logical write id correlates the per-ledger
/// transactions in status maps, receipts, and the write journal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalWriteId(Uuid);

impl LogicalWriteId {
    /// Create a new random logical write identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a logical write identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LogicalWriteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LogicalWriteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
