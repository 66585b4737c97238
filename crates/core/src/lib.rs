//! Storage and queue seams for the facto pipeline.
//!
//! The processor and query service are written against these traits; the
//! production adapters (`facto-scylla`, `facto-nats`) and the in-memory
//! test doubles (`facto-test-helpers`) implement them.

mod error;
mod time;
mod traits;

pub use error::{QueueError, StoreError};
pub use time::utc_day;
pub use traits::{EventQueue, EventStore, Projection, QueueMessage};
