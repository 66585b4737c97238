//! Test doubles and fixtures for the facto pipeline.
//!
//! [`MemoryStore`] and [`MemoryQueue`] implement the `facto-core` seams
//! with the same key semantics as the production adapters (idempotent
//! keyed writes, redelivery on nak), plus failure injection for exercising
//! the processor's retry path.

mod fixtures;
mod queue;
mod store;

pub use fixtures::{sample_draft, session_events, stored, test_recorder};
pub use queue::{MemoryMessage, MemoryQueue};
pub use store::MemoryStore;
