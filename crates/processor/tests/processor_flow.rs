//! End-to-end processor behavior against the in-memory queue and store.

use facto_core::{EventStore, Projection};
use facto_processor::{BatchProcessor, ProcessorConfig};
use facto_test_helpers::{session_events, test_recorder, MemoryQueue, MemoryStore};
use facto_types::{Hash, MerkleTree};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

fn fast_config(batch_size: usize) -> ProcessorConfig {
    ProcessorConfig::with_batch_size(batch_size).flush_interval(Duration::from_millis(20))
}

/// Size-triggered flushing only: the timer never fires, so batch boundaries
/// are deterministic.
fn size_only_config(batch_size: usize) -> ProcessorConfig {
    ProcessorConfig::with_batch_size(batch_size).flush_interval(Duration::from_secs(3600))
}

/// Run the processor until `done` reports true or the deadline passes.
async fn run_until(
    queue: MemoryQueue,
    store: Arc<MemoryStore>,
    config: ProcessorConfig,
    done: impl Fn(&MemoryQueue, &MemoryStore) -> bool,
) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor = BatchProcessor::new(Arc::new(queue.clone()), Arc::clone(&store), config);
    let handle = tokio::spawn(async move { processor.run(shutdown_rx).await });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done(&queue, &store) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "processor did not reach expected state in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown_tx.send(true).expect("processor still running");
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn batch_commit_writes_all_projections_and_root() {
    let queue = MemoryQueue::new();
    let store = Arc::new(MemoryStore::new());

    let mut recorder = test_recorder("agent-a");
    let events = session_events(&mut recorder, 4);
    for event in &events {
        queue.publish_event(event);
    }

    run_until(queue.clone(), Arc::clone(&store), size_only_config(4), |q, s| {
        q.acked().len() == 4 && !s.merkle_roots().is_empty()
    })
    .await;

    assert_eq!(store.event_count(), 4);
    for event in &events {
        let stored = store
            .event_by_facto_id(event.facto_id.as_str())
            .await
            .unwrap()
            .expect("event stored");
        assert_eq!(stored.event, *event);
    }

    // The root commits to the leaves in arrival order.
    let roots = store.merkle_roots();
    assert_eq!(roots.len(), 1);
    let record = &roots[0];
    assert_eq!(record.event_count, 4);
    assert_eq!(record.first_facto_id, events[0].facto_id);
    assert_eq!(record.last_facto_id, events[3].facto_id);

    let leaves: Vec<Hash> = events
        .iter()
        .map(|e| Hash::from_hex(&e.proof.event_hash).unwrap())
        .collect();
    assert_eq!(MerkleTree::build(&leaves).root(), record.root_hash);
    assert_eq!(
        record.event_hashes,
        events
            .iter()
            .map(|e| e.proof.event_hash.clone())
            .collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn projection_failure_naks_batch_and_retry_succeeds() {
    let queue = MemoryQueue::new();
    let store = Arc::new(MemoryStore::new());
    store.fail_next_write(Projection::BySession);

    let mut recorder = test_recorder("agent-b");
    let events = session_events(&mut recorder, 3);
    for event in &events {
        queue.publish_event(event);
    }

    run_until(queue.clone(), Arc::clone(&store), size_only_config(3), |q, _| {
        q.acked().len() == 3
    })
    .await;

    // Every message was redelivered exactly once after the injected failure.
    assert_eq!(queue.naked().len(), 3);
    assert_eq!(queue.acked().len(), 3);
    assert_eq!(queue.pending_count(), 0);

    // Only the successful attempt produced a root.
    let roots = store.merkle_roots();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].event_count, 3);

    // Redelivery stored identical event hashes.
    for event in &events {
        let stored = store
            .event_by_facto_id(event.facto_id.as_str())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.event.proof.event_hash, event.proof.event_hash);
    }
}

#[tokio::test]
async fn duplicate_delivery_is_idempotent() {
    let queue = MemoryQueue::new();
    let store = Arc::new(MemoryStore::new());

    let mut recorder = test_recorder("agent-c");
    let events = session_events(&mut recorder, 2);
    for event in &events {
        queue.publish_event(event);
    }
    // The broker may deliver the same message again.
    queue.publish_event(&events[0]);

    run_until(queue.clone(), Arc::clone(&store), fast_config(10), |q, _| {
        q.acked().len() == 3
    })
    .await;

    // Same primary keys, same bytes: replay overwrites, never duplicates.
    assert_eq!(store.event_count(), 2);
    let session = store
        .events_by_session(events[0].session_id.as_str())
        .await
        .unwrap();
    assert_eq!(session.len(), 2);
}

#[tokio::test]
async fn empty_flush_is_a_noop() {
    let queue = MemoryQueue::new();
    let store = Arc::new(MemoryStore::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor = BatchProcessor::new(
        Arc::new(queue.clone()),
        Arc::clone(&store),
        fast_config(10),
    );
    let handle = tokio::spawn(async move { processor.run(shutdown_rx).await });

    // Let several flush ticks pass with nothing buffered.
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(store.write_calls(), 0);
    assert!(store.merkle_roots().is_empty());
    assert!(queue.acked().is_empty());
    assert!(queue.naked().is_empty());
}

#[tokio::test]
async fn malformed_payload_is_dropped_and_naked() {
    let queue = MemoryQueue::new();
    let store = Arc::new(MemoryStore::new());

    let mut recorder = test_recorder("agent-d");
    let events = session_events(&mut recorder, 1);
    queue.publish_bytes(b"{not json".to_vec());
    queue.publish_event(&events[0]);

    run_until(queue.clone(), Arc::clone(&store), fast_config(10), |q, _| {
        q.acked().len() == 1
    })
    .await;

    assert_eq!(store.event_count(), 1);
    assert!(!queue.naked().is_empty());
}

#[tokio::test]
async fn shutdown_drains_partial_buffer() {
    let queue = MemoryQueue::new();
    let store = Arc::new(MemoryStore::new());

    let mut recorder = test_recorder("agent-e");
    // Fewer events than the batch size, flush interval far in the future:
    // only the shutdown drain can commit them.
    let events = session_events(&mut recorder, 5);
    for event in &events {
        queue.publish_event(event);
    }

    let config = ProcessorConfig::with_batch_size(100).flush_interval(Duration::from_secs(3600));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let processor = BatchProcessor::new(Arc::new(queue.clone()), Arc::clone(&store), config);
    let handle = tokio::spawn(async move { processor.run(shutdown_rx).await });

    // Wait until the puller has picked the messages up.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while queue.pending_count() > 0 {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(store.event_count(), 5);
    assert_eq!(queue.acked().len(), 5);
    assert_eq!(store.merkle_roots().len(), 1);
}
