//! # Error Hierarchy
//!
//! Structured error types for the docket registry, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Each subsystem defines specific error variants that carry diagnostic
//! context: the input that was rejected, the constraint it violated, and
//! actionable information for operators.

use thiserror::Error;

/// Top-level error type for the docket registry core.
#[derive(Error, Debug)]
pub enum DocketError {
    /// Canonicalization failure during fingerprint computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
///
/// These are programmer errors — a payload that cannot be canonicalized was
/// never valid fingerprint input — so callers abort rather than retry.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts must be strings or integers.
    #[error("float values are not permitted in canonical representations; use string or integer for amounts: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes and case summaries.
///
/// Each identifier type enforces format constraints at construction time.
/// These errors carry the invalid input and the expected format so that
/// callers can diagnose bad intake data without guesswork. Validation
/// failures are rejected synchronously and never reach a ledger.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Case identifier violates the charset or length constraints.
    #[error("invalid case id: \"{0}\" (expected 1-64 chars of [A-Za-z0-9-])")]
    InvalidCaseId(String),

    /// Evidence identifier violates the charset or length constraints.
    #[error("invalid evidence id: \"{0}\" (expected 1-64 chars of [A-Za-z0-9-])")]
    InvalidEvidenceId(String),

    /// Owner identifier is empty, too long, or contains whitespace.
    #[error("invalid owner id: \"{0}\" (expected 1-128 chars, no whitespace)")]
    InvalidOwnerId(String),

    /// Ledger identifier violates the charset or length constraints.
    #[error("invalid ledger id: \"{0}\" (expected 1-64 chars of [a-z0-9-], starting alphanumeric)")]
    InvalidLedgerId(String),

    /// Jurisdiction tag cannot be used for case-id allocation.
    #[error("invalid jurisdiction tag: \"{0}\" (expected 1-48 chars of [A-Za-z0-9-])")]
    InvalidJurisdiction(String),

    /// Content digest string does not parse as `<algorithm>:<64 hex chars>`.
    #[error("invalid content digest: \"{0}\" (expected sha256:<64 lowercase hex chars>)")]
    InvalidDigest(String),

    /// Case summary failed schema validation.
    #[error("invalid case summary: {0}")]
    InvalidSummary(String),

    /// Evidence category string matches no known category.
    #[error("unknown evidence category: \"{0}\" (expected one of: photo, message, document, medical, receipt, audio, video, other)")]
    InvalidCategory(String),

    /// Case summary schema version is not supported by this build.
    #[error("unsupported summary schema version {found} (supported: {supported})")]
    UnsupportedSchemaVersion {
        /// The version carried by the summary.
        found: u32,
        /// The highest version this build understands.
        supported: u32,
    },

    /// Claimed amount is not a plain decimal string.
    #[error("invalid amount: \"{0}\" (expected decimal string, e.g. \"1250.00\")")]
    InvalidAmount(String),

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docket_error_canonicalization_display() {
        let inner = CanonicalizationError::FloatRejected(1.5);
        let err = DocketError::Canonicalization(inner);
        let msg = format!("{err}");
        assert!(msg.contains("canonicalization error"));
    }

    #[test]
    fn docket_error_validation_display() {
        let inner = ValidationError::InvalidCaseId("bad id!".to_string());
        let err = DocketError::Validation(inner);
        assert!(format!("{err}").contains("bad id!"));
    }

    #[test]
    fn canonicalization_error_float_rejected() {
        let err = CanonicalizationError::FloatRejected(3.14);
        let msg = format!("{err}");
        assert!(msg.contains("float values are not permitted"));
        assert!(msg.contains("3.14"));
    }

    #[test]
    fn validation_error_invalid_case_id() {
        let err = ValidationError::InvalidCaseId("a b".to_string());
        let msg = format!("{err}");
        assert!(msg.contains("a b"));
        assert!(msg.contains("[A-Za-z0-9-]"));
    }

    #[test]
    fn validation_error_invalid_evidence_id() {
        let err = ValidationError::InvalidEvidenceId("".to_string());
        assert!(format!("{err}").contains("invalid evidence id"));
    }

    #[test]
    fn validation_error_invalid_owner_id() {
        let err = ValidationError::InvalidOwnerId("has space".to_string());
        assert!(format!("{err}").contains("no whitespace"));
    }

    #[test]
    fn validation_error_invalid_ledger_id() {
        let err = ValidationError::InvalidLedgerId("UPPER".to_string());
        assert!(format!("{err}").contains("[a-z0-9-]"));
    }

    #[test]
    fn validation_error_unsupported_schema_version() {
        let err = ValidationError::UnsupportedSchemaVersion {
            found: 7,
            supported: 1,
        };
        let msg = format!("{err}");
        assert!(msg.contains('7'));
        assert!(msg.contains('1'));
    }

    #[test]
    fn validation_error_invalid_category() {
        let err = ValidationError::InvalidCategory("screenshot".to_string());
        let msg = format!("{err}");
        assert!(msg.contains("screenshot"));
        assert!(msg.contains("photo"));
    }

    #[test]
    fn validation_error_invalid_amount() {
        let err = ValidationError::InvalidAmount("12,50".to_string());
        assert!(format!("{err}").contains("decimal string"));
    }

    #[test]
    fn validation_error_invalid_timestamp() {
        let err = ValidationError::InvalidTimestamp {
            value: "not-a-date".to_string(),
            reason: "parse failed".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("not-a-date"));
        assert!(msg.contains("parse failed"));
    }

    #[test]
    fn all_error_types_are_debug() {
        let e1 = DocketError::Json(serde_json::from_str::<u32>("x").unwrap_err());
        let e2 = CanonicalizationError::FloatRejected(0.0);
        let e3 = ValidationError::InvalidDigest("nope".to_string());
        assert!(!format!("{e1:?}").is_empty());
        assert!(!format!("{e2:?}").is_empty());
        assert!(!format!("{e3:?}").is_empty());
    }
}
