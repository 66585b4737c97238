//! Producer-side event recording.
//!
//! An [`EventRecorder`] owns a signing key and the per-session hash-chain
//! state. For each recorded action it assembles the event, computes the
//! canonical bytes, hashes and signs them, and advances the chain.
//!
//! The chain state is a small single-writer state machine: `prev_hash`
//! starts at 64 zeros when a session begins and moves to each event's
//! `event_hash` after a successful local sign. It advances regardless of
//! whether the event is later transmitted; a producer that fails to publish
//! leaves a verifiable gap rather than a fork.

mod recorder;

pub use recorder::{EventDraft, EventRecorder, SessionChain};
