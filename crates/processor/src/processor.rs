//! The pull-buffer-flush loop.
//!
//! Two cooperating tasks: a puller that fetches from the queue and a
//! committer that owns the buffer. They communicate over a bounded channel
//! sized at twice the batch size, so a stalled store backpressures fetching
//! instead of growing memory.
//!
//! Consumer states: Idle -> Fetching -> Buffering -> Flushing -> Idle.
//! Flushing always ends with an empty buffer; shutdown from any state
//! drains into a final flush.

use crate::{metrics, ProcessorConfig};
use facto_core::{utc_day, EventQueue, EventStore, Projection, QueueError, QueueMessage};
use facto_types::{Event, Hash, MerkleRootRecord, MerkleTree, StoredEvent};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Errors that terminate the processor.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The queue failed before the loop could start.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The puller task aborted unexpectedly.
    #[error("Puller task failed: {0}")]
    Puller(String),
}

/// A decoded message waiting in the commit buffer.
struct Pending<M> {
    message: M,
    event: StoredEvent,
    leaf: Hash,
}

/// The batching processor. Runs until the shutdown signal fires.
pub struct BatchProcessor<Q, S> {
    queue: Arc<Q>,
    store: Arc<S>,
    config: ProcessorConfig,
}

impl<Q, S> BatchProcessor<Q, S>
where
    Q: EventQueue + 'static,
    S: EventStore + 'static,
{
    /// Create a processor over a queue and a store.
    pub fn new(queue: Arc<Q>, store: Arc<S>, config: ProcessorConfig) -> Self {
        Self {
            queue,
            store,
            config,
        }
    }

    /// Run until `shutdown` flips to `true`, then drain the buffer through
    /// a final flush and return.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), ProcessorError> {
        let capacity = self.config.batch_size.max(1) * 2;
        let (tx, mut rx) = mpsc::channel::<Q::Message>(capacity);

        let mut puller = tokio::spawn(pull_loop(
            Arc::clone(&self.queue),
            tx,
            self.config.clone(),
            shutdown.clone(),
        ));

        let mut buffer: Vec<Pending<Q::Message>> = Vec::with_capacity(self.config.batch_size);
        let mut ticker = tokio::time::interval(self.config.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval is immediate; skip it so an
        // empty startup buffer is not flushed pointlessly.
        ticker.tick().await;

        info!(
            batch_size = self.config.batch_size,
            flush_interval_ms = self.config.flush_interval.as_millis() as u64,
            "processor started"
        );

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(message) => {
                        self.admit(message, &mut buffer).await;
                        if buffer.len() >= self.config.batch_size {
                            self.flush(&mut buffer).await;
                            ticker.reset();
                        }
                    }
                    // Puller gone; nothing more will arrive.
                    None => break,
                },
                _ = ticker.tick() => self.flush(&mut buffer).await,
                _ = shutdown.changed() => break,
            }
        }

        // Keep receiving while the puller observes the shutdown; it may be
        // mid-send on a full channel and must not be left blocked.
        loop {
            tokio::select! {
                joined = &mut puller => {
                    joined.map_err(|e| ProcessorError::Puller(e.to_string()))?;
                    break;
                }
                received = rx.recv() => {
                    if let Some(message) = received {
                        self.admit(message, &mut buffer).await;
                        if buffer.len() >= self.config.batch_size {
                            self.flush(&mut buffer).await;
                        }
                    }
                }
            }
        }
        // Drain what the puller already handed over, then flush the rest.
        while let Ok(message) = rx.try_recv() {
            self.admit(message, &mut buffer).await;
            if buffer.len() >= self.config.batch_size {
                self.flush(&mut buffer).await;
            }
        }
        self.flush(&mut buffer).await;
        info!("processor stopped");
        Ok(())
    }

    /// Decode a message into the buffer, or drop-and-nak it as malformed.
    async fn admit(&self, message: Q::Message, buffer: &mut Vec<Pending<Q::Message>>) {
        match decode_event(message.payload()) {
            Ok((event, leaf)) => buffer.push(Pending {
                message,
                event,
                leaf,
            }),
            Err(e) => {
                warn!(error = %e, "dropping undecodable message");
                metrics::MALFORMED_MESSAGES.inc();
                if let Err(ack_err) = message.nak().await {
                    warn!(error = %ack_err, "nak of malformed message failed");
                }
            }
        }
    }

    /// Commit one batch: Merkle root, three parallel projection writes,
    /// root record, then acknowledgements. An empty buffer is a no-op.
    async fn flush(&self, buffer: &mut Vec<Pending<Q::Message>>) {
        if buffer.is_empty() {
            return;
        }

        let started = Instant::now();
        let batch = std::mem::take(buffer);
        let events: Vec<StoredEvent> = batch.iter().map(|p| p.event.clone()).collect();
        let leaves: Vec<Hash> = batch.iter().map(|p| p.leaf).collect();

        // Leaves commit to batch arrival order, nothing more; ordering
        // across batches is not guaranteed and must not be assumed.
        let tree = MerkleTree::build(&leaves);

        let written = tokio::try_join!(
            self.store.write_projection(Projection::ByAgent, &events),
            self.store.write_projection(Projection::ByFactoId, &events),
            self.store.write_projection(Projection::BySession, &events),
        );

        if let Err(error) = written {
            error!(
                events = batch.len(),
                %error,
                "projection write failed; requesting redelivery"
            );
            metrics::BATCH_FAILURES.inc();
            for pending in &batch {
                if let Err(e) = pending.message.nak().await {
                    warn!(error = %e, "nak failed");
                }
            }
            return;
        }

        let now = now_nanos();
        let record = MerkleRootRecord {
            date: utc_day(now),
            bucket_time: now,
            root_hash: tree.root(),
            event_count: batch.len() as i32,
            first_facto_id: events[0].event.facto_id.clone(),
            last_facto_id: events[events.len() - 1].event.facto_id.clone(),
            event_hashes: leaves.iter().map(|h| h.to_hex()).collect(),
        };
        if let Err(error) = self.store.write_merkle_root(&record).await {
            // The root is derivable from the stored events, so the batch
            // stands; do not retract writes or trigger redelivery.
            warn!(%error, "merkle root write failed; continuing");
            metrics::ROOT_WRITE_FAILURES.inc();
        }

        for pending in &batch {
            if let Err(e) = pending.message.ack().await {
                warn!(error = %e, "ack failed");
            }
        }

        metrics::EVENTS_PROCESSED.inc_by(batch.len() as u64);
        metrics::BATCHES_COMMITTED.inc();
        metrics::BATCH_SIZE.observe(batch.len() as f64);
        metrics::FLUSH_DURATION.observe(started.elapsed().as_secs_f64());
        debug!(
            events = batch.len(),
            root = %record.root_hash,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch committed"
        );
    }
}

/// Fetch loop: runs alongside the committer so the next batch fills while
/// the current one is being written.
async fn pull_loop<Q>(
    queue: Arc<Q>,
    tx: mpsc::Sender<Q::Message>,
    config: ProcessorConfig,
    mut shutdown: watch::Receiver<bool>,
) where
    Q: EventQueue,
{
    loop {
        if *shutdown.borrow() {
            return;
        }

        let fetched = tokio::select! {
            _ = shutdown.changed() => return,
            fetched = queue.fetch(config.batch_size, config.flush_interval) => fetched,
        };

        match fetched {
            Ok(messages) => {
                for message in messages {
                    // Committer gone; stop fetching.
                    if tx.send(message).await.is_err() {
                        return;
                    }
                }
            }
            Err(error) => {
                warn!(%error, "queue fetch failed; backing off");
                tokio::time::sleep(config.fetch_backoff).await;
            }
        }
    }
}

/// Decode a queue payload into a stored event and its Merkle leaf.
fn decode_event(payload: &[u8]) -> Result<(StoredEvent, Hash), DecodeError> {
    let event: Event = serde_json::from_slice(payload)?;
    let leaf = Hash::from_hex(&event.proof.event_hash)
        .map_err(|e| DecodeError::BadEventHash(e.to_string()))?;
    Ok((
        StoredEvent {
            event,
            received_at: now_nanos(),
        },
        leaf,
    ))
}

#[derive(Debug, Error)]
enum DecodeError {
    #[error("Invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid event_hash: {0}")]
    BadEventHash(String),
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_event(b"not json").is_err());
        assert!(decode_event(b"{}").is_err());
    }

    #[test]
    fn test_max_ack_pending_tracks_batch_size() {
        let config = ProcessorConfig::with_batch_size(250);
        assert_eq!(config.max_ack_pending(), 500);
    }
}
