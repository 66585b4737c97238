//! Core traits at the I/O seams.

use crate::{QueueError, StoreError};
use async_trait::async_trait;
use facto_types::{MerkleRootRecord, StoredEvent};
use std::time::Duration;

/// The three denormalized projections every batch is written to.
///
/// All three hold the same events keyed differently; the processor writes
/// them concurrently and acknowledges upstream only when all three landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    /// Partition `(agent_id, date)`, clustered by completion time.
    /// Serves agent + time-range queries.
    ByAgent,
    /// Partition `facto_id`. Point lookup.
    ByFactoId,
    /// Partition `session_id`, clustered by `completed_at`. Session walk.
    BySession,
}

impl Projection {
    /// All projections, in the order the processor fans writes out.
    pub const ALL: [Projection; 3] = [
        Projection::ByAgent,
        Projection::ByFactoId,
        Projection::BySession,
    ];
}

/// Durable event storage.
///
/// Writes must be idempotent: every projection keys rows by `facto_id`
/// (within its partition), so replaying a batch overwrites with identical
/// bytes. That property is what lets at-least-once delivery upstream become
/// effectively-once storage.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Write one batch into a single projection as one atomic storage batch.
    async fn write_projection(
        &self,
        projection: Projection,
        events: &[StoredEvent],
    ) -> Result<(), StoreError>;

    /// Persist a per-batch Merkle commitment record.
    async fn write_merkle_root(&self, record: &MerkleRootRecord) -> Result<(), StoreError>;

    /// Events for one agent on one UTC day (`YYYY-MM-DD`), bounded by a
    /// `completed_at` range in nanoseconds, ascending by completion time.
    async fn events_by_agent_day(
        &self,
        agent_id: &str,
        date: &str,
        start_ns: i64,
        end_ns: i64,
    ) -> Result<Vec<StoredEvent>, StoreError>;

    /// Point lookup by facto id.
    async fn event_by_facto_id(&self, facto_id: &str)
        -> Result<Option<StoredEvent>, StoreError>;

    /// All events of a session, ascending by `completed_at`.
    async fn events_by_session(&self, session_id: &str) -> Result<Vec<StoredEvent>, StoreError>;
}

/// A message pulled from the durable work queue.
///
/// Acknowledgement is explicit and per-message: `ack` once the batch is
/// durably stored, `nak` to request redelivery.
#[async_trait]
pub trait QueueMessage: Send + Sync {
    /// Raw payload bytes (JSON-encoded event).
    fn payload(&self) -> &[u8];

    /// Positively acknowledge; the broker purges the message.
    async fn ack(&self) -> Result<(), QueueError>;

    /// Negatively acknowledge; the broker redelivers.
    async fn nak(&self) -> Result<(), QueueError>;
}

/// A pull-based durable work queue of events.
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Message handle type carrying payload and ack controls.
    type Message: QueueMessage + Send + 'static;

    /// Fetch up to `max_messages`, waiting at most `max_wait`. Returning
    /// fewer (or zero) messages is normal when the stream is idle.
    async fn fetch(
        &self,
        max_messages: usize,
        max_wait: Duration,
    ) -> Result<Vec<Self::Message>, QueueError>;
}
