//! Session management, schema bootstrap, and the `EventStore` impl.

use crate::rows::EventRow;
use crate::schema;
use async_trait::async_trait;
use facto_core::{EventStore, Projection, StoreError};
use facto_types::{MerkleRootRecord, StoredEvent};
use scylla::batch::{Batch, BatchType};
use scylla::execution_profile::ExecutionProfile;
use scylla::prepared_statement::PreparedStatement;
use scylla::{Session, SessionBuilder};
use std::time::Duration;
use tracing::info;

/// Connection settings for the storage cluster.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Contact points, e.g. `127.0.0.1:9042`.
    pub hosts: Vec<String>,

    /// Keyspace holding all facto tables.
    pub keyspace: String,

    /// Replication factor used when the keyspace is first created.
    pub replication_factor: u32,

    /// Per-statement deadline.
    pub request_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["127.0.0.1:9042".to_string()],
            keyspace: "facto".to_string(),
            replication_factor: 1,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// ScyllaDB-backed event store.
pub struct ScyllaStore {
    session: Session,
    request_timeout: Duration,
    insert_events: PreparedStatement,
    insert_by_facto_id: PreparedStatement,
    insert_by_session: PreparedStatement,
    insert_root: PreparedStatement,
    select_agent_day: PreparedStatement,
    select_facto: PreparedStatement,
    select_session: PreparedStatement,
}

impl ScyllaStore {
    /// Connect, bootstrap the keyspace and tables, and prepare statements.
    pub async fn connect(config: StoreConfig) -> Result<Self, StoreError> {
        let session = SessionBuilder::new()
            .known_nodes(&config.hosts)
            .build()
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))?;

        let keyspace_ddl = schema::CREATE_KEYSPACE
            .replace("{ks}", &config.keyspace)
            .replace("{rf}", &config.replication_factor.to_string());
        session
            .query_unpaged(keyspace_ddl, ())
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;
        session
            .use_keyspace(&config.keyspace, true)
            .await
            .map_err(|e| StoreError::Schema(e.to_string()))?;

        for ddl in [
            schema::CREATE_EVENTS,
            schema::CREATE_EVENTS_BY_FACTO_ID,
            schema::CREATE_EVENTS_BY_SESSION,
            schema::CREATE_MERKLE_ROOTS,
        ] {
            session
                .query_unpaged(ddl, ())
                .await
                .map_err(|e| StoreError::Schema(e.to_string()))?;
        }

        let timeout = config.request_timeout;
        let store = Self {
            insert_events: prepare(&session, schema::insert_event("events"), timeout).await?,
            insert_by_facto_id: prepare(
                &session,
                schema::insert_event("events_by_facto_id"),
                timeout,
            )
            .await?,
            insert_by_session: prepare(
                &session,
                schema::insert_event("events_by_session"),
                timeout,
            )
            .await?,
            insert_root: prepare(&session, schema::INSERT_MERKLE_ROOT.to_string(), timeout)
                .await?,
            select_agent_day: prepare(&session, schema::select_by_agent_day(), timeout).await?,
            select_facto: prepare(&session, schema::select_by_facto_id(), timeout).await?,
            select_session: prepare(&session, schema::select_by_session(), timeout).await?,
            request_timeout: timeout,
            session,
        };

        info!(keyspace = %config.keyspace, "storage ready");
        Ok(store)
    }
}

async fn prepare(
    session: &Session,
    cql: String,
    timeout: Duration,
) -> Result<PreparedStatement, StoreError> {
    let mut statement = session
        .prepare(cql)
        .await
        .map_err(|e| StoreError::Schema(e.to_string()))?;
    statement.set_request_timeout(Some(timeout));
    Ok(statement)
}

impl ScyllaStore {
    fn statement_for(&self, projection: Projection) -> &PreparedStatement {
        match projection {
            Projection::ByAgent => &self.insert_events,
            Projection::ByFactoId => &self.insert_by_facto_id,
            Projection::BySession => &self.insert_by_session,
        }
    }

    fn collect_rows(result: scylla::QueryResult) -> Result<Vec<StoredEvent>, StoreError> {
        let rows = result
            .into_rows_result()
            .map_err(|e| StoreError::Read(e.to_string()))?;
        let mut events = Vec::new();
        for row in rows
            .rows::<EventRow>()
            .map_err(|e| StoreError::Decode(e.to_string()))?
        {
            let row = row.map_err(|e| StoreError::Decode(e.to_string()))?;
            events.push(row.into_stored());
        }
        Ok(events)
    }
}

#[async_trait]
impl EventStore for ScyllaStore {
    async fn write_projection(
        &self,
        projection: Projection,
        events: &[StoredEvent],
    ) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }

        // One unlogged batch per projection: atomic from the processor's
        // point of view, no cross-partition coordination cost.
        let statement = self.statement_for(projection);
        let mut batch = Batch::new(BatchType::Unlogged);
        let mut rows = Vec::with_capacity(events.len());
        for stored in events {
            batch.append_statement(statement.clone());
            rows.push(EventRow::encode(stored)?);
        }
        let profile = ExecutionProfile::builder()
            .request_timeout(Some(self.request_timeout))
            .build();
        batch.set_execution_profile_handle(Some(profile.into_handle()));

        self.session
            .batch(&batch, rows)
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }

    async fn write_merkle_root(&self, record: &MerkleRootRecord) -> Result<(), StoreError> {
        self.session
            .execute_unpaged(
                &self.insert_root,
                (
                    &record.date,
                    record.bucket_time,
                    record.root_hash.to_hex(),
                    record.event_count,
                    record.first_facto_id.as_str(),
                    record.last_facto_id.as_str(),
                    &record.event_hashes,
                    record.bucket_time,
                ),
            )
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        Ok(())
    }

    async fn events_by_agent_day(
        &self,
        agent_id: &str,
        date: &str,
        start_ns: i64,
        end_ns: i64,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        let result = self
            .session
            .execute_unpaged(&self.select_agent_day, (agent_id, date, start_ns, end_ns))
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Self::collect_rows(result)
    }

    async fn event_by_facto_id(
        &self,
        facto_id: &str,
    ) -> Result<Option<StoredEvent>, StoreError> {
        let result = self
            .session
            .execute_unpaged(&self.select_facto, (facto_id,))
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(Self::collect_rows(result)?.into_iter().next())
    }

    async fn events_by_session(&self, session_id: &str) -> Result<Vec<StoredEvent>, StoreError> {
        let result = self
            .session
            .execute_unpaged(&self.select_session, (session_id,))
            .await
            .map_err(|e| StoreError::Read(e.to_string()))?;
        Self::collect_rows(result)
    }
}
