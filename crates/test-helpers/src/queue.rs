//! In-memory work queue with nak-redelivery semantics.

use async_trait::async_trait;
use facto_core::{EventQueue, QueueError, QueueMessage};
use facto_types::Event;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Shared {
    pending: Mutex<VecDeque<(u64, Vec<u8>)>>,
    acked: Mutex<Vec<u64>>,
    naked: Mutex<Vec<u64>>,
    next_id: AtomicU64,
}

/// In-memory `EventQueue`.
///
/// `nak` requeues the message under its original id, mirroring broker
/// redelivery; `ack` retires it.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    shared: Arc<Shared>,
}

impl MemoryQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue raw payload bytes, returning the message id.
    pub fn publish_bytes(&self, payload: Vec<u8>) -> u64 {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.pending.lock().push_back((id, payload));
        id
    }

    /// Enqueue an event as its JSON wire form.
    pub fn publish_event(&self, event: &Event) -> u64 {
        self.publish_bytes(serde_json::to_vec(event).expect("event serializes"))
    }

    /// Messages currently awaiting delivery (including redeliveries).
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Ids positively acknowledged so far.
    pub fn acked(&self) -> Vec<u64> {
        self.shared.acked.lock().clone()
    }

    /// Ids negatively acknowledged so far (each nak is recorded, so a
    /// message redelivered twice appears twice).
    pub fn naked(&self) -> Vec<u64> {
        self.shared.naked.lock().clone()
    }
}

#[async_trait]
impl EventQueue for MemoryQueue {
    type Message = MemoryMessage;

    async fn fetch(
        &self,
        max_messages: usize,
        max_wait: Duration,
    ) -> Result<Vec<Self::Message>, QueueError> {
        let batch: Vec<MemoryMessage> = {
            let mut pending = self.shared.pending.lock();
            let take = pending.len().min(max_messages);
            pending
                .drain(..take)
                .map(|(id, payload)| MemoryMessage {
                    id,
                    payload,
                    shared: Arc::clone(&self.shared),
                })
                .collect()
        };

        if batch.is_empty() {
            // Simulate the broker's bounded wait without busy-looping tests.
            tokio::time::sleep(max_wait.min(Duration::from_millis(5))).await;
        }
        Ok(batch)
    }
}

/// A message handed out by [`MemoryQueue`].
pub struct MemoryMessage {
    id: u64,
    payload: Vec<u8>,
    shared: Arc<Shared>,
}

impl MemoryMessage {
    /// The queue-assigned message id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl QueueMessage for MemoryMessage {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(&self) -> Result<(), QueueError> {
        self.shared.acked.lock().push(self.id);
        Ok(())
    }

    async fn nak(&self) -> Result<(), QueueError> {
        self.shared.naked.lock().push(self.id);
        self.shared
            .pending
            .lock()
            .push_back((self.id, self.payload.clone()));
        Ok(())
    }
}
