//! Prometheus metrics for the processor.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, Histogram, IntCounter,
};

lazy_static! {
    /// Events durably stored across all three projections.
    pub static ref EVENTS_PROCESSED: IntCounter = register_int_counter!(
        "facto_processor_events_total",
        "Events durably stored"
    )
    .unwrap();

    /// Batches committed (projections written and acknowledged).
    pub static ref BATCHES_COMMITTED: IntCounter = register_int_counter!(
        "facto_processor_batches_total",
        "Batches committed"
    )
    .unwrap();

    /// Batches whose projection writes failed and were sent back for
    /// redelivery.
    pub static ref BATCH_FAILURES: IntCounter = register_int_counter!(
        "facto_processor_batch_failures_total",
        "Batches that failed storage and were negatively acknowledged"
    )
    .unwrap();

    /// Messages dropped because the payload did not decode into an event.
    pub static ref MALFORMED_MESSAGES: IntCounter = register_int_counter!(
        "facto_processor_malformed_messages_total",
        "Messages with undecodable payloads"
    )
    .unwrap();

    /// Root records that failed to persist (events were still committed).
    pub static ref ROOT_WRITE_FAILURES: IntCounter = register_int_counter!(
        "facto_processor_root_write_failures_total",
        "Merkle root records that failed to persist"
    )
    .unwrap();

    /// Events per committed batch.
    pub static ref BATCH_SIZE: Histogram = register_histogram!(
        "facto_processor_batch_size",
        "Events per committed batch",
        prometheus::exponential_buckets(1.0, 2.0, 12).unwrap()
    )
    .unwrap();

    /// Wall-clock seconds from flush start to acknowledgement.
    pub static ref FLUSH_DURATION: Histogram = register_histogram!(
        "facto_processor_flush_duration_seconds",
        "Flush latency in seconds"
    )
    .unwrap();
}
