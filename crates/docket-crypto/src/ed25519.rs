//! # Ed25519 Signing and Verification
//!
//! Key and signature wrappers for registrar receipt attestations.
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes` — you cannot sign raw bytes.
//!   Two parties serializing the same receipt body therefore sign and
//!   verify the same message, regardless of key order or whitespace in
//!   their JSON.
//! - Private keys are never serialized or logged. [`SigningKey`] does not
//!   implement `Serialize`, its `Debug` output is redacted, and key
//!   material is zeroized on drop (dalek's `zeroize` feature).
//!
//! ## Serde
//!
//! Public keys and signatures serialize as hex-encoded strings, matching
//! how they appear in receipts and journal entries.

use ed25519_dalek::{Signer, Verifier};
use rand_core::CryptoRngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use docket_core::CanonicalBytes;

use crate::error::CryptoError;

/// An Ed25519 signing (private) key for receipt attestations.
///
/// Does not implement `Serialize` or `Clone` — the key lives in one place
/// and is shared behind an `Arc` where needed.
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

/// An Ed25519 verifying (public) key (32 bytes).
///
/// Serializes as a hex-encoded string for JSON interoperability.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VerifyingKey([u8; 32]);

/// An Ed25519 signature (64 bytes).
///
/// Produced only over `CanonicalBytes` input. Serializes as a hex-encoded
/// string.
#[derive(Clone, PartialEq, Eq)]
pub struct Ed25519Signature(pub [u8; 64]);

// ---------------------------------------------------------------------------
// SigningKey impls
// ---------------------------------------------------------------------------

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate<R: CryptoRngCore + ?Sized>(csprng: &mut R) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::generate(csprng),
        }
    }

    /// Create a signing key from a raw 32-byte seed.
    pub fn from_bytes(seed: &[u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Parse a signing key from a 64-character hex seed.
    ///
    /// Intermediate buffers are zeroized; the hex string itself is owned by
    /// the caller (typically read from the environment).
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let normalized = hex.trim().to_lowercase();
        let decoded = Zeroizing::new(
            hex_to_bytes(&normalized).map_err(CryptoError::HexDecode)?,
        );
        if decoded.len() != 32 {
            return Err(CryptoError::HexDecode(format!(
                "signing key hex must decode to 32 bytes, got {}",
                decoded.len()
            )));
        }
        let mut seed = Zeroizing::new([0u8; 32]);
        seed.copy_from_slice(&decoded);
        Ok(Self::from_bytes(&seed))
    }

    /// Sign canonical bytes.
    ///
    /// The signing input MUST be `&CanonicalBytes`: attestation signatures
    /// cover the canonical receipt body, so any verifier that canonicalizes
    /// the same body verifies against the same message.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        let sig = self.inner.sign(data.as_bytes());
        Ed25519Signature(sig.to_bytes())
    }

    /// The public half of this key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.inner.verifying_key().to_bytes())
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<private>)")
    }
}

// ---------------------------------------------------------------------------
// VerifyingKey impls
// ---------------------------------------------------------------------------

impl VerifyingKey {
    /// Create a verifying key from raw 32 bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Return the raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the public key as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a public key from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let normalized = hex.trim().to_lowercase();
        let decoded = hex_to_bytes(&normalized).map_err(CryptoError::HexDecode)?;
        if decoded.len() != 32 {
            return Err(CryptoError::InvalidPublicKey(format!(
                "expected 32 bytes, got {}",
                decoded.len()
            )));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&decoded);
        Ok(Self(arr))
    }

    /// Verify a signature over canonical bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if the key bytes are not a
    /// valid curve point, or [`CryptoError::VerificationFailed`] if the
    /// signature does not verify.
    pub fn verify(
        &self,
        data: &CanonicalBytes,
        signature: &Ed25519Signature,
    ) -> Result<(), CryptoError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        vk.verify(data.as_bytes(), &sig)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
    }
}

impl Serialize for VerifyingKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for VerifyingKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature impls
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    /// Create a signature from raw 64 bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Return the raw 64-byte signature.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Render the signature as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a signature from a 128-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let normalized = hex.trim().to_lowercase();
        let decoded = hex_to_bytes(&normalized).map_err(CryptoError::HexDecode)?;
        if decoded.len() != 64 {
            return Err(CryptoError::InvalidSignatureLength(decoded.len()));
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&decoded);
        Ok(Self(arr))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex_prefix(&self.0))
    }
}

impl std::fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Hex utilities (no external hex crate dependency)
// ---------------------------------------------------------------------------

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

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(value: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::new(&value).unwrap()
    }

    #[test]
    fn test_generate_and_sign_verify() {
        let key = SigningKey::generate(&mut rand_core::OsRng);
        let body = canonical(serde_json::json!({
            "case_id": "KHI-2025-001",
            "summary_fingerprint": "sha256:abc"
        }));
        let sig = key.sign(&body);
        assert_eq!(sig.as_bytes().len(), 64);
        key.verifying_key()
            .verify(&body, &sig)
            .expect("valid signature should verify");
    }

    #[test]
    fn test_verify_wrong_key_fails() {
        let key1 = SigningKey::generate(&mut rand_core::OsRng);
        let key2 = SigningKey::generate(&mut rand_core::OsRng);
        let body = canonical(serde_json::json!({"receipt": true}));
        let sig = key1.sign(&body);
        assert!(key2.verifying_key().verify(&body, &sig).is_err());
    }

    #[test]
    fn test_verify_wrong_message_fails() {
        let key = SigningKey::generate(&mut rand_core::OsRng);
        let original = canonical(serde_json::json!({"case_id": "KHI-2025-001"}));
        let tampered = canonical(serde_json::json!({"case_id": "KHI-2025-002"}));
        let sig = key.sign(&original);
        assert!(key.verifying_key().verify(&tampered, &sig).is_err());
    }

    #[test]
    fn test_verify_tampered_signature_fails() {
        let key = SigningKey::generate(&mut rand_core::OsRng);
        let body = canonical(serde_json::json!({"x": 1}));
        let mut sig = key.sign(&body);
        sig.0[0] ^= 0x01;
        assert!(key.verifying_key().verify(&body, &sig).is_err());
    }

    #[test]
    fn test_deterministic_from_seed() {
        let seed = [42u8; 32];
        let key1 = SigningKey::from_bytes(&seed);
        let key2 = SigningKey::from_bytes(&seed);
        assert_eq!(key1.verifying_key(), key2.verifying_key());

        let body = canonical(serde_json::json!({"deterministic": true}));
        assert_eq!(key1.sign(&body), key2.sign(&body));
    }

    #[test]
    fn test_known_seed_derives_known_public_key() {
        // RFC 8032 test vector 1: seed -> public key.
        let key = SigningKey::from_hex(
            "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60",
        )
        .unwrap();
        assert_eq!(
            key.verifying_key().to_hex(),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }

    #[test]
    fn test_signing_key_from_hex_invalid() {
        assert!(SigningKey::from_hex("not-hex").is_err());
        assert!(SigningKey::from_hex("aabb").is_err());
        assert!(SigningKey::from_hex(&"ff".repeat(33)).is_err());
    }

    #[test]
    fn test_public_key_hex_roundtrip() {
        let pk = SigningKey::generate(&mut rand_core::OsRng).verifying_key();
        let hex = pk.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(VerifyingKey::from_hex(&hex).unwrap(), pk);
    }

    #[test]
    fn test_public_key_invalid_hex() {
        assert!(VerifyingKey::from_hex("not-hex").is_err());
        assert!(VerifyingKey::from_hex("aabb").is_err());
        assert!(VerifyingKey::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let key = SigningKey::generate(&mut rand_core::OsRng);
        let sig = key.sign(&canonical(serde_json::json!({"x": 1})));
        let hex = sig.to_hex();
        assert_eq!(hex.len(), 128);
        assert_eq!(Ed25519Signature::from_hex(&hex).unwrap(), sig);
    }

    #[test]
    fn test_signature_invalid_hex() {
        assert!(Ed25519Signature::from_hex("not-hex").is_err());
        assert!(matches!(
            Ed25519Signature::from_hex("aabb"),
            Err(CryptoError::InvalidSignatureLength(2))
        ));
    }

    #[test]
    fn test_public_key_serde_json_roundtrip() {
        let pk = SigningKey::generate(&mut rand_core::OsRng).verifying_key();
        let json = serde_json::to_string(&pk).unwrap();
        assert_eq!(json.len(), 64 + 2); // 64 hex chars + 2 quotes
        let back: VerifyingKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pk);
    }

    #[test]
    fn test_signature_serde_json_roundtrip() {
        let key = SigningKey::generate(&mut rand_core::OsRng);
        let sig = key.sign(&canonical(serde_json::json!({"y": 2})));
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json.len(), 128 + 2); // 128 hex chars + 2 quotes
        let back: Ed25519Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }

    #[test]
    fn test_debug_does_not_leak_private_key() {
        let key = SigningKey::generate(&mut rand_core::OsRng);
        let debug = format!("{key:?}");
        assert_eq!(debug, "SigningKey(<private>)");
    }

    #[test]
    fn test_debug_public_key_shows_prefix() {
        let pk = SigningKey::generate(&mut rand_core::OsRng).verifying_key();
        let debug = format!("{pk:?}");
        assert!(debug.starts_with("VerifyingKey("));
        assert!(debug.ends_with("...)"));
    }
}
