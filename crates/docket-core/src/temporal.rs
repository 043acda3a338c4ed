//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp type that enforces the
//! canonicalization requirement of ISO8601 with Z suffix, truncated
//! to seconds precision.
//!
//! ## Security Invariant
//!
//! Timestamps in the registry must be UTC with Z suffix for deterministic
//! fingerprints. Local timezone offsets would produce different canonical
//! byte sequences for the same instant, so two producers recording the same
//! filing could disagree about its fingerprint.
//!
//! Non-UTC inputs are **rejected** by the strict parser — there is no silent
//! conversion on that path. [`Timestamp::parse_lenient()`] exists for intake
//! data, where offsets are converted to UTC before anything is fingerprinted.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// This type guarantees that all timestamps in the registry are in UTC
/// with no sub-second components, matching the canonicalization rule that
/// normalizes datetimes to `YYYY-MM-DDTHH:MM:SSZ`.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current UTC time, truncated.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — from an ISO8601 string, rejecting non-UTC offsets.
/// - [`Timestamp::parse_lenient()`] — from an ISO8601 string, converting to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        let now = Utc::now();
        Self(truncate_to_seconds(now))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 / ISO8601 string.
    ///
    /// **Rejects non-UTC inputs.** Only timestamps with the `Z` suffix are
    /// accepted. Timestamps with explicit offsets like `+00:00`, `+05:30`,
    /// or `-04:00` are rejected — even `+00:00`, which is semantically
    /// equivalent to `Z`. Journal entries and receipts round-trip through
    /// this parser, so any drift from the canonical form surfaces as an
    /// error instead of a silently different fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] if:
    /// - The string is not valid RFC 3339.
    /// - The string uses a non-Z timezone offset.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must use Z suffix (UTC only)".to_string(),
            });
        }

        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any timezone
    /// offset and converting to UTC.
    ///
    /// This is the parser for intake data such as case summary incident
    /// dates. The result is always UTC with seconds precision, matching the
    /// strict invariant. For round-tripping registry-produced strings,
    /// prefer [`Timestamp::parse()`].
    pub fn parse_lenient(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    ///
    /// This output is byte-identical to what the canonicalization pipeline
    /// produces for datetime strings, so a timestamp rendered here and
    /// re-ingested fingerprints the same.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
