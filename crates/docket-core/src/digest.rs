//! # Content Digest — Fingerprints and Content Addressing
//!
//! Defines `ContentDigest` and `DigestAlgorithm` for the two fingerprint
//! paths in the registry:
//!
//! - **Structured summaries** are fingerprinted through [`sha256_digest()`],
//!   which accepts only `CanonicalBytes`. The signature enforces that every
//!   summary fingerprint passed through the canonicalization pipeline.
//! - **Evidence files** are fingerprinted through [`sha256_raw()`] over their
//!   verbatim bytes. Evidence is opaque binary content; canonicalizing it
//!   would change the bytes being attested.
//!
//! The two paths never mix: a summary fingerprint is a digest of canonical
//! JSON, an evidence fingerprint is a digest of exact file content.
//!
//! ## Wire Format
//!
//! Digests serialize as `<algorithm>:<64 lowercase hex chars>` strings, e.g.
//! `sha256:44136fa3...`. Ledger entries, receipts, and verification reports
//! all carry this form.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::ValidationError;

/// The hash algorithm used to produce a content digest.
///
/// SHA-256 is the only supported algorithm. Every digest carries an
/// algorithm tag so that stored fingerprints remain interpretable if a
/// future schema version introduces another algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256 — standard content addressing.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content-addressed digest with its algorithm tag.
///
/// Produced from canonical bytes via [`sha256_digest()`] or from verbatim
/// file bytes via [`sha256_raw()`]. The 32-byte digest and algorithm tag
/// together form a self-describing content identifier.
///
/// Serializes as the string `sha256:<64 lowercase hex chars>` rather than a
/// struct, so ledger entries and receipts stay human-diffable.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a content digest from raw bytes and algorithm.
    ///
    /// Prefer [`sha256_digest()`] or [`sha256_raw()`]; this constructor
    /// exists for deserialization and tests.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Return the raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Render the digest value as a lowercase hex string (no algorithm tag).
    ///
    /// This is the form used for storage locators: evidence files live at
    /// `<root>/<to_hex()>.bin`.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a SHA-256 digest from a 64-character hex string (no tag).
    ///
    /// Input is trimmed and lowercased before parsing, so pasted uppercase
    /// hex is accepted; rendering is always lowercase.
    pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
        let normalized = hex.trim().to_lowercase();
        if normalized.len() != 64 {
            return Err(ValidationError::InvalidDigest(hex.to_string()));
        }
        let decoded = hex_to_bytes(&normalized)
            .map_err(|_| ValidationError::InvalidDigest(hex.to_string()))?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        Ok(Self::new(DigestAlgorithm::Sha256, bytes))
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::str::FromStr for ContentDigest {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some(("sha256", hex)) => Self::from_hex(hex),
            _ => Err(ValidationError::InvalidDigest(s.to_string())),
        }
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentDigest({}:{}...)", self.algorithm, hex_prefix(&self.bytes))
    }
}

/// Compute a SHA-256 fingerprint from canonical bytes.
///
/// This is the digest path for structured data: case summaries, receipts,
/// anything whose fingerprint must be stable across producers.
///
/// # Security Invariant
///
/// Accepts only `&CanonicalBytes`, not raw `&[u8]`. No code path can
/// fingerprint a summary that skipped the canonicalization pipeline.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    digest_of(data.as_bytes())
}

/// Compute a SHA-256 fingerprint over verbatim bytes.
///
/// This is the digest path for evidence file content. The bytes are hashed
/// exactly as supplied — no canonicalization, no normalization. Re-reading
/// the same file always reproduces the same fingerprint.
pub fn sha256_raw(data: &[u8]) -> ContentDigest {
    digest_of(data)
}

fn digest_of(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("invalid hex at position {i}: {e}"))
        })
        .collect()
}
