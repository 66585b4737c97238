//! Core types for the facto audit trail.
//!
//! This crate defines the cryptographic contract every producer and verifier
//! of audit events must agree on:
//!
//! - [`Hash`]: 32-byte digest newtype with SHA3-256 and SHA-256 constructors
//! - [`Event`]: the signed, immutable record of one agent action
//! - [`canonical_bytes`]: the byte-exact serialization used as hash and
//!   signature input
//! - [`KeyPair`] / [`PublicKey`] / [`Signature`]: Ed25519 signing primitives
//! - [`verify_event`]: hash and signature re-derivation
//! - [`MerkleTree`]: per-batch commitment with inclusion proofs

mod canonical;
mod crypto;
mod event;
mod hash;
mod identifiers;
mod merkle;
mod verify;

pub use canonical::canonical_bytes;
pub use crypto::{KeyPair, KeyParseError, PublicKey, Signature};
pub use event::{Event, ExecutionMeta, Proof, StoredEvent};
pub use hash::{Hash, HexError};
pub use identifiers::{AgentId, FactoId, SessionId};
pub use merkle::{
    verify_proof, MerkleRootRecord, MerkleTree, ProofStep, SiblingPosition,
};
pub use verify::{verify_event, VerifyOutcome};
