//! ScyllaDB adapter for durable event storage.
//!
//! Three denormalized tables hold the same events under different primary
//! keys, plus a `merkle_roots` table for batch commitments. Each projection
//! write is a single unlogged batch; idempotence comes from the primary
//! keys, not from transactions.

mod rows;
mod schema;
mod store;

pub use store::{ScyllaStore, StoreConfig};
