//! Error types for the storage and queue seams.

use thiserror::Error;

/// Errors from the event store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Could not reach or authenticate to the storage cluster.
    #[error("Storage connection failed: {0}")]
    Connect(String),

    /// Schema bootstrap failed.
    #[error("Schema setup failed: {0}")]
    Schema(String),

    /// A write (projection batch or root record) failed.
    #[error("Storage write failed: {0}")]
    Write(String),

    /// A read failed.
    #[error("Storage read failed: {0}")]
    Read(String),

    /// A row could not be decoded into an event.
    #[error("Row decode failed: {0}")]
    Decode(String),
}

/// Errors from the work queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Could not reach the broker.
    #[error("Queue connection failed: {0}")]
    Connect(String),

    /// Stream provisioning failed.
    #[error("Stream setup failed: {0}")]
    Stream(String),

    /// Consumer provisioning failed.
    #[error("Consumer setup failed: {0}")]
    Consumer(String),

    /// A fetch call failed.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// An acknowledgement (ack or nak) failed.
    #[error("Ack failed: {0}")]
    Ack(String),

    /// A publish failed.
    #[error("Publish failed: {0}")]
    Publish(String),
}
