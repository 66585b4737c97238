//! Cryptographic hash type.
//!
//! Event hashes use SHA3-256, Merkle nodes use SHA-256. Both are 32 bytes,
//! so a single newtype covers the whole pipeline; the constructor picks the
//! digest.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as Sha2Digest, Sha256};
use sha3::Sha3_256;
use std::fmt;

/// A 32-byte cryptographic hash.
///
/// Rendered as lowercase hex everywhere it crosses a wire or a table.
/// Safe to use as a HashMap key; all hashing operations are deterministic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// Size of hash in bytes.
    pub const BYTES: usize = 32;

    /// Zero hash (all bytes are 0x00). Marks the start of a session chain.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Hash bytes with SHA3-256 (event hashing).
    pub fn sha3_256(bytes: &[u8]) -> Self {
        let mut hasher = Sha3_256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Hash bytes with SHA-256 (Merkle nodes and session digests).
    pub fn sha256(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// SHA-256 over the concatenation of two child hashes.
    pub fn sha256_pair(left: &Hash, right: &Hash) -> Self {
        let mut data = [0u8; 64];
        data[..32].copy_from_slice(left.as_bytes());
        data[32..].copy_from_slice(right.as_bytes());
        Self::sha256(&data)
    }

    /// Parse hash from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        if hex.len() != 64 {
            return Err(HexError::InvalidLength {
                expected: 64,
                actual: hex.len(),
            });
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes).map_err(|_| HexError::InvalidHex)?;

        Ok(Self(bytes))
    }

    /// Convert hash to a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero hash.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Hash({}..{})", &hex[..8], &hex[56..])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Hash::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when parsing hex strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// Invalid hex string length.
    #[error("Invalid hex length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid hex characters.
    #[error("Invalid hex string")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha3_deterministic() {
        let data = b"hello world";
        let hash1 = Hash::sha3_256(data);
        let hash2 = Hash::sha3_256(data);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_digests_differ() {
        // SHA3-256 and SHA-256 of the same input must not collide.
        let data = b"same input";
        assert_ne!(Hash::sha3_256(data), Hash::sha256(data));
    }

    #[test]
    fn test_hex_roundtrip() {
        let original = Hash::sha3_256(b"test data");
        let hex = original.to_hex();
        assert_eq!(hex.len(), 64);

        let parsed = Hash::from_hex(&hex).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(matches!(
            Hash::from_hex("abcd"),
            Err(HexError::InvalidLength { .. })
        ));
        assert!(matches!(
            Hash::from_hex(&"zz".repeat(32)),
            Err(HexError::InvalidHex)
        ));
    }

    #[test]
    fn test_is_zero() {
        assert!(Hash::ZERO.is_zero());
        assert_eq!(Hash::ZERO.to_hex(), "0".repeat(64));
        assert!(!Hash::sha3_256(b"test").is_zero());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash = Hash::sha256(b"abc");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));

        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
