//! # Case Summary Schema — Versioned Fingerprint Input
//!
//! Defines [`CaseSummary`], the fixed schema for the structured summary that
//! is fingerprinted when a case is opened, and [`EvidenceCategory`], the
//! closed set of evidence classification tags.
//!
//! ## Versioning Invariant
//!
//! `schema_version` serializes into the canonical bytes, so it is part of
//! every fingerprint. A future schema revision produces different canonical
//! bytes for the same content, which means historical fingerprints can never
//! be silently reinterpreted under new field semantics.
//!
//! ## Optional Fields
//!
//! `None` fields are omitted from serialization entirely. A producer that
//! leaves `narrative` out of its JSON and one that sets it to `None` here
//! compute the same fingerprint.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::canonical::CanonicalBytes;
use crate::digest::{sha256_digest, ContentDigest};
use crate::error::{DocketError, ValidationError};
use crate::temporal::Timestamp;

/// The current case summary schema version.
pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Maximum narrative length in characters. Summaries are ledger payloads;
/// long-form material belongs in evidence files.
const NARRATIVE_MAX_CHARS: usize = 4096;

/// The structured summary recorded when a case is opened.
///
/// Only the fingerprint of this structure reaches a ledger; the summary
/// itself stays with the filing party and anyone they share it with. A
/// verifier who holds the summary re-canonicalizes it and compares the
/// fingerprint against the on-ledger value.
///
/// # Fields
///
/// - `schema_version` — must equal [`SUMMARY_SCHEMA_VERSION`]; fingerprinted.
/// - `issue` — required one-line statement of the grievance.
/// - `narrative` — optional free-text account, capped at 4096 characters.
/// - `incident_date` — optional UTC timestamp of the underlying incident.
/// - `amount_claimed` — optional decimal string (e.g. `"1250.00"`). Floats
///   are rejected by canonicalization, so amounts are strings end to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSummary {
    /// Schema version; part of the fingerprint input.
    pub schema_version: u32,
    /// One-line statement of the issue. Required, non-empty.
    pub issue: String,
    /// Free-text account of the dispute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    /// When the underlying incident occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_date: Option<Timestamp>,
    /// Claimed amount as a decimal string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_claimed: Option<String>,
}

impl CaseSummary {
    /// Create a minimal summary at the current schema version.
    pub fn new(issue: impl Into<String>) -> Self {
        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            issue: issue.into(),
            narrative: None,
            incident_date: None,
            amount_claimed: None,
        }
    }

    /// Validate the summary against the schema rules.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::UnsupportedSchemaVersion`] if `schema_version`
    ///   is not the current version.
    /// - [`ValidationError::InvalidSummary`] if `issue` is empty or the
    ///   narrative exceeds the length cap.
    /// - [`ValidationError::InvalidAmount`] if `amount_claimed` is present
    ///   but not a plain non-negative decimal string.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SUMMARY_SCHEMA_VERSION {
            return Err(ValidationError::UnsupportedSchemaVersion {
                found: self.schema_version,
                supported: SUMMARY_SCHEMA_VERSION,
            });
        }
        if self.issue.trim().is_empty() {
            return Err(ValidationError::InvalidSummary(
                "issue must be non-empty".to_string(),
            ));
        }
        if let Some(narrative) = &self.narrative {
            if narrative.chars().count() > NARRATIVE_MAX_CHARS {
                return Err(ValidationError::InvalidSummary(format!(
                    "narrative exceeds {NARRATIVE_MAX_CHARS} characters"
                )));
            }
        }
        if let Some(amount) = &self.amount_claimed {
            if !is_decimal_string(amount) {
                return Err(ValidationError::InvalidAmount(amount.clone()));
            }
        }
        Ok(())
    }

    /// Validate, canonicalize, and fingerprint the summary.
    ///
    /// This is the value recorded on every configured ledger when the case
    /// is opened. Deterministic: the same summary content always produces
    /// the same digest, regardless of producing host or field order in the
    /// source JSON.
    pub fn fingerprint(&self) -> Result<ContentDigest, DocketError> {
        self.validate()?;
        let cb = CanonicalBytes::new(self)?;
        Ok(sha256_digest(&cb))
    }
}

/// Check that a string is a plain non-negative decimal: digits, at most one
/// `.`, non-empty on both sides of it. No signs, no grouping, no exponents.
fn is_decimal_string(s: &str) -> bool {
    match s.split_once('.') {
        None => !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
        Some((whole, frac)) => {
            !whole.is_empty()
                && !frac.is_empty()
                && whole.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
    }
}

/// Classification tag attached to each evidence item.
///
/// Informational only: the contract stores the tag verbatim and never
/// branches on it. The set is closed so that listings and reports can
/// group evidence without free-text drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    /// Still photograph.
    Photo,
    /// Chat or SMS transcript.
    Message,
    /// Scanned or digital document.
    Document,
    /// Medical record or report.
    Medical,
    /// Payment receipt or invoice.
    Receipt,
    /// Audio recording.
    Audio,
    /// Video recording.
    Video,
    /// Anything that fits no other category.
    Other,
}

impl EvidenceCategory {
    /// Returns all categories in canonical order.
    pub fn all() -> &'static [EvidenceCategory] {
        &[
            Self::Photo,
            Self::Message,
            Self::Document,
            Self::Medical,
            Self::Receipt,
            Self::Audio,
            Self::Video,
            Self::Other,
        ]
    }

    /// Returns the snake_case string identifier for this category.
    ///
    /// Matches the serde serialization format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Message => "message",
            Self::Document => "document",
            Self::Medical => "medical",
            Self::Receipt => "receipt",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvidenceCategory {
    type Err = ValidationError;

    /// Parse a category from its snake_case identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(Self::Photo),
            "message" => Ok(Self::Message),
            "document" => Ok(Self::Document),
            "medical" => Ok(Self::Medical),
            "receipt" => Ok(Self::Receipt),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            "other" => Ok(Self::Other),
            other => Err(ValidationError::InvalidCategory(other.to_string())),
        }
    }
}
