//! Keyspace and table DDL.
//!
//! Dates are `text` in `YYYY-MM-DD` form; every writer and reader derives
//! them with `facto_core::utc_day` from `completed_at` (events) or the
//! commit instant (roots).

/// Shared column list for the three event projections.
macro_rules! event_columns {
    () => {
        "agent_id text, \
         date text, \
         facto_id text, \
         session_id text, \
         parent_facto_id text, \
         action_type text, \
         status text, \
         input_data blob, \
         output_data blob, \
         model_id text, \
         model_hash text, \
         temperature double, \
         seed bigint, \
         max_tokens int, \
         tool_calls blob, \
         sdk_version text, \
         sdk_language text, \
         tags map<text, text>, \
         signature blob, \
         public_key blob, \
         prev_hash text, \
         event_hash text, \
         started_at bigint, \
         completed_at bigint, \
         received_at bigint"
    };
}

pub const CREATE_KEYSPACE: &str = "CREATE KEYSPACE IF NOT EXISTS {ks} WITH replication = \
     {'class': 'NetworkTopologyStrategy', 'replication_factor': {rf}}";

pub const CREATE_EVENTS: &str = concat!(
    "CREATE TABLE IF NOT EXISTS events (",
    event_columns!(),
    ", PRIMARY KEY ((agent_id, date), completed_at, facto_id)\
     ) WITH CLUSTERING ORDER BY (completed_at ASC, facto_id ASC)"
);

pub const CREATE_EVENTS_BY_FACTO_ID: &str = concat!(
    "CREATE TABLE IF NOT EXISTS events_by_facto_id (",
    event_columns!(),
    ", PRIMARY KEY (facto_id))"
);

pub const CREATE_EVENTS_BY_SESSION: &str = concat!(
    "CREATE TABLE IF NOT EXISTS events_by_session (",
    event_columns!(),
    ", PRIMARY KEY (session_id, completed_at, facto_id)\
     ) WITH CLUSTERING ORDER BY (completed_at ASC, facto_id ASC)"
);

pub const CREATE_MERKLE_ROOTS: &str = "CREATE TABLE IF NOT EXISTS merkle_roots (\
     date text, \
     bucket_time bigint, \
     root_hash text, \
     event_count int, \
     first_facto_id text, \
     last_facto_id text, \
     event_hashes list<text>, \
     created_at bigint, \
     PRIMARY KEY (date, bucket_time))";

const COLUMN_NAMES: &str = "agent_id, date, facto_id, session_id, parent_facto_id, \
     action_type, status, input_data, output_data, model_id, model_hash, temperature, \
     seed, max_tokens, tool_calls, sdk_version, sdk_language, tags, signature, \
     public_key, prev_hash, event_hash, started_at, completed_at, received_at";

/// INSERT statement for one of the event projections.
pub fn insert_event(table: &str) -> String {
    let placeholders = vec!["?"; 25].join(", ");
    format!("INSERT INTO {table} ({COLUMN_NAMES}) VALUES ({placeholders})")
}

pub const INSERT_MERKLE_ROOT: &str = "INSERT INTO merkle_roots \
     (date, bucket_time, root_hash, event_count, first_facto_id, last_facto_id, \
      event_hashes, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

pub fn select_by_agent_day() -> String {
    format!(
        "SELECT {COLUMN_NAMES} FROM events \
         WHERE agent_id = ? AND date = ? AND completed_at >= ? AND completed_at <= ?"
    )
}

pub fn select_by_facto_id() -> String {
    format!("SELECT {COLUMN_NAMES} FROM events_by_facto_id WHERE facto_id = ?")
}

pub fn select_by_session() -> String {
    format!("SELECT {COLUMN_NAMES} FROM events_by_session WHERE session_id = ?")
}
