//! NATS JetStream adapter for the facto work queue.
//!
//! Provisions the event stream with work-queue retention (acked messages
//! are purged, bounding replay) and a durable pull consumer with explicit
//! acknowledgement, then exposes both sides of the seam: batch fetching
//! for the processor and publishing for producers.

mod queue;

pub use queue::{EventPublisher, JetStreamMessage, JetStreamQueue, QueueConfig};
