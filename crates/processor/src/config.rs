//! Processor tuning.

use std::time::Duration;

/// Configuration for the batching processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Flush when this many events are buffered.
    pub batch_size: usize,

    /// Flush at least this often, full buffer or not.
    pub flush_interval: Duration,

    /// Pause after a failed queue fetch before retrying.
    pub fetch_backoff: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            flush_interval: Duration::from_secs(1),
            fetch_backoff: Duration::from_secs(1),
        }
    }
}

impl ProcessorConfig {
    /// Create a config with a custom batch size.
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Default::default()
        }
    }

    /// Override the flush interval.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Broker-side cap on unacknowledged deliveries. Keeping this at twice
    /// the batch size lets one batch be in flight while the next fills
    /// without letting the broker run ahead of a stalled store.
    pub fn max_ack_pending(&self) -> i64 {
        (self.batch_size * 2) as i64
    }
}
