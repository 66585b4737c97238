//! Ed25519 key pairs and signatures.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fmt;

/// An Ed25519 key pair for signing events.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Build a keypair from a 32-byte seed (for tests and key files).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Parse a keypair from a hex-encoded 32-byte seed.
    pub fn from_hex_seed(hex_seed: &str) -> Result<Self, KeyParseError> {
        let mut seed = [0u8; 32];
        if hex_seed.len() != 64 {
            return Err(KeyParseError::InvalidSeedLength(hex_seed.len()));
        }
        hex::decode_to_slice(hex_seed, &mut seed).map_err(|_| KeyParseError::InvalidHex)?;
        Ok(Self::from_seed(&seed))
    }

    /// Raw 32-byte seed, hex encoded.
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key())
    }
}

/// An Ed25519 public key (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Decode from standard Base64. Anything that is not exactly 32 decoded
    /// bytes is rejected.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyParseError> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| KeyParseError::InvalidBase64)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyParseError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Standard Base64 encoding of the raw key bytes.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Verify a signature over a message. Malformed key material yields
    /// `false`, never a panic.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        use ed25519_dalek::Verifier;
        let pk = match ed25519_dalek::VerifyingKey::from_bytes(&self.0) {
            Ok(pk) => pk,
            Err(_) => return false,
        };
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        pk.verify(message, &sig).is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// An Ed25519 signature (64 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Decode from standard Base64. Anything that is not exactly 64 decoded
    /// bytes is rejected.
    pub fn from_base64(encoded: &str) -> Result<Self, KeyParseError> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| KeyParseError::InvalidBase64)?;
        let arr: [u8; 64] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyParseError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Standard Base64 encoding of the raw signature bytes.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}..)", &hex::encode(self.0)[..16])
    }
}

/// Errors that can occur when decoding key material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    /// Not valid Base64.
    #[error("Invalid Base64 encoding")]
    InvalidBase64,

    /// Not valid hex.
    #[error("Invalid hex encoding")]
    InvalidHex,

    /// Decoded public key was not 32 bytes.
    #[error("Invalid public key length: expected 32, got {0}")]
    InvalidKeyLength(usize),

    /// Decoded signature was not 64 bytes.
    #[error("Invalid signature length: expected 64, got {0}")]
    InvalidSignatureLength(usize),

    /// Hex seed was not 64 characters.
    #[error("Invalid seed length: expected 64 hex chars, got {0}")]
    InvalidSeedLength(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = KeyPair::generate();
        let message = b"test message";

        let signature = keypair.sign(message);
        let pubkey = keypair.public_key();

        assert!(pubkey.verify(message, &signature));
    }

    #[test]
    fn test_verify_fails_wrong_message() {
        let keypair = KeyPair::generate();
        let signature = keypair.sign(b"test message");

        assert!(!keypair.public_key().verify(b"wrong message", &signature));
    }

    #[test]
    fn test_keypair_from_seed_deterministic() {
        let seed = [42u8; 32];

        let kp1 = KeyPair::from_seed(&seed);
        let kp2 = KeyPair::from_seed(&seed);

        let msg = b"test";
        assert_eq!(kp1.sign(msg).0, kp2.sign(msg).0);
        assert_eq!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_hex_seed_roundtrip() {
        let keypair = KeyPair::generate();
        let restored = KeyPair::from_hex_seed(&keypair.seed_hex()).unwrap();
        assert_eq!(keypair.public_key(), restored.public_key());
    }

    #[test]
    fn test_base64_roundtrip() {
        let keypair = KeyPair::generate();
        let sig = keypair.sign(b"payload");

        let pk = PublicKey::from_base64(&keypair.public_key().to_base64()).unwrap();
        let sig2 = Signature::from_base64(&sig.to_base64()).unwrap();

        assert!(pk.verify(b"payload", &sig2));
    }

    #[test]
    fn test_malformed_base64_rejected() {
        assert!(matches!(
            PublicKey::from_base64("not base64!!!"),
            Err(KeyParseError::InvalidBase64)
        ));
        // Valid Base64, wrong decoded length.
        assert!(matches!(
            PublicKey::from_base64("c2hvcnQ="),
            Err(KeyParseError::InvalidKeyLength(5))
        ));
        assert!(matches!(
            Signature::from_base64("c2hvcnQ="),
            Err(KeyParseError::InvalidSignatureLength(5))
        ));
    }
}
