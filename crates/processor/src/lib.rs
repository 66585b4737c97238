//! The batching processor.
//!
//! Pulls JSON events from a durable work queue, buffers them up to a size
//! or time threshold, commits each batch with a Merkle root, fans the batch
//! out across three denormalized projections in parallel, and acknowledges
//! upstream only after durable storage succeeds. At-least-once delivery in,
//! effectively-once storage out.

mod config;
pub mod metrics;
mod processor;

pub use config::ProcessorConfig;
pub use processor::{BatchProcessor, ProcessorError};
