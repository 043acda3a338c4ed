//! # Content-Addressed Evidence Store
//!
//! Filesystem storage for evidence file bytes, addressed by their SHA-256
//! fingerprint: `{base_dir}/evidence/{digest_hex}.bin`.
//!
//! ## Integrity Invariant
//!
//! Every stored file's name encodes the digest of its content. On retrieval
//! the digest is recomputed from the bytes read and compared against the
//! locator in constant time; corruption or tampering surfaces as
//! [`StoreError::IntegrityViolation`], never as silently different bytes.
//!
//! Writes are create-if-absent. Storing the same bytes twice is an
//! idempotent no-op because both writes target the same path.
//!
//! The store holds opaque bytes. Nothing here canonicalizes, parses, or
//! rewrites content — the fingerprint attests to the exact file.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;

use docket_core::{sha256_raw, ContentDigest};

use crate::error::StoreError;

/// A reference to content held in the evidence store.
///
/// Rendered as `cas:sha256:<64 lowercase hex chars>`. The locator is
/// derivable from content alone, so any party holding the original file can
/// reconstruct it without asking the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageLocator(ContentDigest);

impl StorageLocator {
    /// Build the locator for content with the given digest.
    pub fn for_digest(digest: ContentDigest) -> Self {
        Self(digest)
    }

    /// The content digest this locator points at.
    pub fn digest(&self) -> &ContentDigest {
        &self.0
    }
}

impl std::fmt::Display for StorageLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cas:{}", self.0)
    }
}

impl std::str::FromStr for StorageLocator {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digest = s
            .trim()
            .strip_prefix("cas:")
            .and_then(|rest| rest.parse::<ContentDigest>().ok())
            .ok_or_else(|| StoreError::InvalidLocator(s.to_string()))?;
        Ok(Self(digest))
    }
}

impl Serialize for StorageLocator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StorageLocator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A filesystem-backed content-addressed store for evidence files.
///
/// The registry references stored content by locator and never depends on
/// the store for integrity: registration fetches bytes back and rehashes
/// them, and verification rehashes the candidate file a verifier supplies.
#[derive(Debug, Clone)]
pub struct EvidenceStore {
    root: PathBuf,
}

impl EvidenceStore {
    /// Open (creating if needed) a store rooted at `{base_dir}/evidence/`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = base_dir.as_ref().join("evidence");
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store bytes, returning the locator for their content.
    ///
    /// The digest is computed from the bytes themselves; callers cannot
    /// choose the storage path. If content with the same digest is already
    /// stored, the existing file is verified against the digest and the
    /// write is skipped.
    pub fn put(&self, bytes: &[u8]) -> Result<StorageLocator, StoreError> {
        let digest = sha256_raw(bytes);
        let path = self.path_for(&digest);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(bytes)?;
                // Evidence bytes must reach disk before their fingerprint
                // reaches any ledger.
                file.sync_all()?;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let existing = fs::read(&path)?;
                verify_digest(&digest, &sha256_raw(&existing))?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(StorageLocator::for_digest(digest))
    }

    /// Fetch the bytes for a locator, verifying integrity on the way out.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if nothing is stored under the locator.
    /// - [`StoreError::IntegrityViolation`] if the stored bytes no longer
    ///   hash to the locator's digest.
    pub fn get(&self, locator: &StorageLocator) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(locator.digest());
        let bytes = fs::read(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound(locator.clone())
            } else {
                StoreError::Io(e)
            }
        })?;
        verify_digest(locator.digest(), &sha256_raw(&bytes))?;
        Ok(bytes)
    }

    /// Whether content for the locator is present (no integrity check).
    pub fn contains(&self, locator: &StorageLocator) -> bool {
        self.path_for(locator.digest()).exists()
    }

    /// List the locators of all stored content, sorted by hex digest.
    ///
    /// Files that do not follow the `<64 hex>.bin` naming scheme are
    /// skipped; the store directory may hold operator notes or temp files.
    pub fn list(&self) -> Result<Vec<StorageLocator>, StoreError> {
        let mut locators = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bin") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(digest) = ContentDigest::from_hex(stem) {
                locators.push(StorageLocator::for_digest(digest));
            }
        }
        locators.sort_by_key(|l| l.digest().to_hex());
        Ok(locators)
    }

    fn path_for(&self, digest: &ContentDigest) -> PathBuf {
        self.root.join(format!("{}.bin", digest.to_hex()))
    }
}

/// Constant-time digest comparison for stored content.
fn verify_digest(expected: &ContentDigest, actual: &ContentDigest) -> Result<(), StoreError> {
    if bool::from(expected.as_bytes().ct_eq(actual.as_bytes())) {
        Ok(())
    } else {
        Err(StoreError::IntegrityViolation {
            expected: expected.clone(),
            actual: actual.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, EvidenceStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = EvidenceStore::new(dir.path()).unwrap();
        (dir, store)
    }

    // -- put / get --

    #[test]
    fn put_then_get_round_trips() {
        let (_dir, store) = store();
        let bytes = b"photo of the north wall, 2025-02-14";
        let locator = store.put(bytes).unwrap();
        assert_eq!(store.get(&locator).unwrap(), bytes);
    }

    #[test]
    fn locator_derives_from_content() {
        let (_dir, store) = store();
        let locator = store.put(b"receipt scan").unwrap();
        assert_eq!(*locator.digest(), sha256_raw(b"receipt scan"));
    }

    #[test]
    fn put_is_idempotent_for_same_content() {
        let (_dir, store) = store();
        let a = store.put(b"same bytes").unwrap();
        let b = store.put(b"same bytes").unwrap();
        assert_eq!(a, b);
        assert_eq!(store.get(&a).unwrap(), b"same bytes");
    }

    #[test]
    fn different_content_gets_different_paths() {
        let (_dir, store) = store();
        let a = store.put(b"exhibit a").unwrap();
        let b = store.put(b"exhibit b").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.get(&a).unwrap(), b"exhibit a");
        assert_eq!(store.get(&b).unwrap(), b"exhibit b");
    }

    #[test]
    fn get_missing_is_not_found() {
        let (_dir, store) = store();
        let locator = StorageLocator::for_digest(sha256_raw(b"never stored"));
        assert!(matches!(
            store.get(&locator),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn empty_file_round_trips() {
        let (_dir, store) = store();
        let locator = store.put(b"").unwrap();
        assert_eq!(store.get(&locator).unwrap(), b"");
    }

    // -- integrity --

    #[test]
    fn tampered_file_fails_integrity_on_get() {
        let (dir, store) = store();
        let locator = store.put(b"original evidence").unwrap();
        let path = dir
            .path()
            .join("evidence")
            .join(format!("{}.bin", locator.digest().to_hex()));
        fs::write(&path, b"swapped evidence").unwrap();
        assert!(matches!(
            store.get(&locator),
            Err(StoreError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn put_detects_corrupt_preexisting_file() {
        let (dir, store) = store();
        let digest = sha256_raw(b"the real bytes");
        let path = dir
            .path()
            .join("evidence")
            .join(format!("{}.bin", digest.to_hex()));
        fs::write(&path, b"an impostor").unwrap();
        assert!(matches!(
            store.put(b"the real bytes"),
            Err(StoreError::IntegrityViolation { .. })
        ));
    }

    // -- contains / list --

    #[test]
    fn contains_reflects_storage() {
        let (_dir, store) = store();
        let locator = store.put(b"here").unwrap();
        let absent = StorageLocator::for_digest(sha256_raw(b"not here"));
        assert!(store.contains(&locator));
        assert!(!store.contains(&absent));
    }

    #[test]
    fn list_returns_stored_locators_sorted() {
        let (_dir, store) = store();
        let mut expected = vec![
            store.put(b"one").unwrap(),
            store.put(b"two").unwrap(),
            store.put(b"three").unwrap(),
        ];
        expected.sort_by_key(|l| l.digest().to_hex());
        assert_eq!(store.list().unwrap(), expected);
    }

    #[test]
    fn list_skips_foreign_files() {
        let (dir, store) = store();
        let locator = store.put(b"real").unwrap();
        fs::write(dir.path().join("evidence").join("README.txt"), b"notes").unwrap();
        fs::write(dir.path().join("evidence").join("nothex.bin"), b"junk").unwrap();
        assert_eq!(store.list().unwrap(), vec![locator]);
    }

    // -- locator parsing --

    #[test]
    fn locator_display_parse_round_trip() {
        let locator = StorageLocator::for_digest(sha256_raw(b"{}"));
        let rendered = locator.to_string();
        assert!(rendered.starts_with("cas:sha256:"));
        let parsed: StorageLocator = rendered.parse().unwrap();
        assert_eq!(parsed, locator);
    }

    #[test]
    fn locator_rejects_malformed_strings() {
        for bad in [
            "",
            "cas:",
            "cas:sha256:",
            "cas:sha256:zzzz",
            "cas:md5:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
            "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a",
        ] {
            assert!(
                bad.parse::<StorageLocator>().is_err(),
                "locator {bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn locator_serde_as_string() {
        let locator = StorageLocator::for_digest(sha256_raw(b"serde"));
        let json = serde_json::to_string(&locator).unwrap();
        assert_eq!(json, format!("\"{locator}\""));
        let back: StorageLocator = serde_json::from_str(&json).unwrap();
        assert_eq!(back, locator);
    }
}
