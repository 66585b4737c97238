//! Event verification: hash and signature re-derivation.

use crate::{canonical_bytes, Event, Hash, PublicKey, Signature};

/// Result of verifying a single event in isolation.
///
/// Chain validity is out of scope here; it needs the previous event and is
/// the query service's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// `event_hash` equals SHA3-256 of the canonical form.
    pub hash_valid: bool,

    /// The Ed25519 signature over the canonical form checks out.
    pub signature_valid: bool,
}

impl VerifyOutcome {
    /// Both checks passed.
    pub fn is_valid(&self) -> bool {
        self.hash_valid && self.signature_valid
    }
}

/// Verify one event: recompute the canonical bytes, re-derive the SHA3-256
/// hash, and check the Ed25519 signature.
///
/// Never fails: malformed Base64, wrong key or signature lengths, and
/// malformed stored hashes all surface as `false` in the outcome.
pub fn verify_event(event: &Event) -> VerifyOutcome {
    let canonical = canonical_bytes(event);

    let computed = Hash::sha3_256(&canonical);
    let hash_valid = match Hash::from_hex(&event.proof.event_hash) {
        Ok(stored) => stored == computed,
        Err(_) => false,
    };

    let signature_valid = match (
        PublicKey::from_base64(&event.proof.public_key),
        Signature::from_base64(&event.proof.signature),
    ) {
        (Ok(pk), Ok(sig)) => pk.verify(&canonical, &sig),
        _ => false,
    };

    VerifyOutcome {
        hash_valid,
        signature_valid,
    }
}
