//! In-memory event store with the production adapters' key semantics.

use async_trait::async_trait;
use facto_core::{utc_day, EventStore, Projection, StoreError};
use facto_types::{MerkleRootRecord, StoredEvent};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

type ClusterKey = (i64, String);

#[derive(Default)]
struct Inner {
    /// (agent_id, date) -> (completed_at, facto_id) -> event.
    by_agent: HashMap<(String, String), BTreeMap<ClusterKey, StoredEvent>>,
    /// facto_id -> event.
    by_facto: HashMap<String, StoredEvent>,
    /// session_id -> (completed_at, facto_id) -> event.
    by_session: HashMap<String, BTreeMap<ClusterKey, StoredEvent>>,
    roots: Vec<MerkleRootRecord>,
    /// Projections whose next write should fail (consumed on use).
    fail_once: HashSet<Projection>,
    write_calls: usize,
}

/// In-memory `EventStore`.
///
/// Rows are keyed exactly like the wide-column tables, so replaying a batch
/// overwrites rather than duplicates.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write to `projection` fail with a transient error.
    pub fn fail_next_write(&self, projection: Projection) {
        self.inner.lock().fail_once.insert(projection);
    }

    /// Persisted Merkle-root records, in commit order.
    pub fn merkle_roots(&self) -> Vec<MerkleRootRecord> {
        self.inner.lock().roots.clone()
    }

    /// Number of rows in the point-lookup projection.
    pub fn event_count(&self) -> usize {
        self.inner.lock().by_facto.len()
    }

    /// Total `write_projection` calls, including failed ones.
    pub fn write_calls(&self) -> usize {
        self.inner.lock().write_calls
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn write_projection(
        &self,
        projection: Projection,
        events: &[StoredEvent],
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.write_calls += 1;

        if inner.fail_once.remove(&projection) {
            return Err(StoreError::Write(format!(
                "injected failure for {projection:?}"
            )));
        }

        for stored in events {
            let event = &stored.event;
            let cluster = (
                event.completed_at,
                event.facto_id.as_str().to_string(),
            );
            match projection {
                Projection::ByAgent => {
                    let partition = (
                        event.agent_id.as_str().to_string(),
                        utc_day(event.completed_at),
                    );
                    inner
                        .by_agent
                        .entry(partition)
                        .or_default()
                        .insert(cluster, stored.clone());
                }
                Projection::ByFactoId => {
                    inner
                        .by_facto
                        .insert(event.facto_id.as_str().to_string(), stored.clone());
                }
                Projection::BySession => {
                    inner
                        .by_session
                        .entry(event.session_id.as_str().to_string())
                        .or_default()
                        .insert(cluster, stored.clone());
                }
            }
        }
        Ok(())
    }

    async fn write_merkle_root(&self, record: &MerkleRootRecord) -> Result<(), StoreError> {
        self.inner.lock().roots.push(record.clone());
        Ok(())
    }

    async fn events_by_agent_day(
        &self,
        agent_id: &str,
        date: &str,
        start_ns: i64,
        end_ns: i64,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        let inner = self.inner.lock();
        let partition = (agent_id.to_string(), date.to_string());
        Ok(inner
            .by_agent
            .get(&partition)
            .map(|rows| {
                rows.values()
                    .filter(|e| e.event.completed_at >= start_ns && e.event.completed_at <= end_ns)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn event_by_facto_id(
        &self,
        facto_id: &str,
    ) -> Result<Option<StoredEvent>, StoreError> {
        Ok(self.inner.lock().by_facto.get(facto_id).cloned())
    }

    async fn events_by_session(&self, session_id: &str) -> Result<Vec<StoredEvent>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .by_session
            .get(session_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }
}
