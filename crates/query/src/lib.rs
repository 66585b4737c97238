//! The query and verification service.
//!
//! A stateless read plane over the event store: agent/time listings, point
//! lookups, session walks, per-event and whole-chain integrity checks, and
//! evidence packages with Merkle inclusion proofs for offline audit.
//!
//! Verification never throws: every failed check becomes a boolean (plus a
//! structured error entry) in the response body. HTTP errors are reserved
//! for malformed queries (400), absent data (404), and backend failures
//! (500, generic message).

mod error;
mod http;
mod service;

pub use error::ApiError;
pub use http::router;
pub use service::{
    ChainChecks, ChainIssue, ChainReport, EventPage, EvidencePackage, EvidenceProof,
    ListParams, QueryService, VerifyChecks, VerifyResponse,
};
