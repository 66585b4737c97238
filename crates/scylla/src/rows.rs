//! Row mapping between wire events and the flattened column layout.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use facto_core::{utc_day, StoreError};
use facto_types::{AgentId, Event, ExecutionMeta, FactoId, Proof, SessionId, StoredEvent};
use scylla::{DeserializeRow, SerializeRow};
use std::collections::HashMap;

/// One event row, shared by all three projection tables.
///
/// `execution_meta` is flattened into individual columns; Base64 proof
/// material is stored as raw bytes and re-encoded on read.
#[derive(Debug, Clone, SerializeRow, DeserializeRow)]
pub struct EventRow {
    pub agent_id: String,
    pub date: String,
    pub facto_id: String,
    pub session_id: String,
    pub parent_facto_id: Option<String>,
    pub action_type: String,
    pub status: String,
    pub input_data: Vec<u8>,
    pub output_data: Vec<u8>,
    pub model_id: Option<String>,
    pub model_hash: Option<String>,
    pub temperature: Option<f64>,
    pub seed: Option<i64>,
    pub max_tokens: Option<i32>,
    pub tool_calls: Option<Vec<u8>>,
    pub sdk_version: Option<String>,
    pub sdk_language: Option<String>,
    pub tags: Option<HashMap<String, String>>,
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
    pub prev_hash: String,
    pub event_hash: String,
    pub started_at: i64,
    pub completed_at: i64,
    pub received_at: i64,
}

impl EventRow {
    /// Flatten a stored event into the column layout.
    pub fn encode(stored: &StoredEvent) -> Result<Self, StoreError> {
        let event = &stored.event;
        let meta = event.execution_meta.as_ref();

        let to_blob = |value: &serde_json::Value| -> Result<Vec<u8>, StoreError> {
            serde_json::to_vec(value).map_err(|e| StoreError::Decode(e.to_string()))
        };

        Ok(Self {
            agent_id: event.agent_id.as_str().to_string(),
            date: utc_day(event.completed_at),
            facto_id: event.facto_id.as_str().to_string(),
            session_id: event.session_id.as_str().to_string(),
            parent_facto_id: event
                .parent_facto_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
            action_type: event.action_type.clone(),
            status: event.status.clone(),
            input_data: to_blob(&event.input_data)?,
            output_data: to_blob(&event.output_data)?,
            model_id: meta.and_then(|m| m.model_id.clone()),
            model_hash: meta.and_then(|m| m.model_hash.clone()),
            temperature: meta.and_then(|m| m.temperature),
            seed: meta.and_then(|m| m.seed),
            max_tokens: meta.and_then(|m| m.max_tokens),
            tool_calls: meta
                .and_then(|m| m.tool_calls.as_ref())
                .map(|v| to_blob(v))
                .transpose()?,
            sdk_version: meta.map(|m| m.sdk_version.clone()),
            sdk_language: meta.map(|m| m.sdk_language.clone()),
            tags: meta
                .filter(|m| !m.tags.is_empty())
                .map(|m| m.tags.clone()),
            // Undecodable Base64 stores as empty bytes; verification will
            // report the signature invalid either way.
            signature: BASE64.decode(&event.proof.signature).unwrap_or_default(),
            public_key: BASE64.decode(&event.proof.public_key).unwrap_or_default(),
            prev_hash: event.proof.prev_hash.clone(),
            event_hash: event.proof.event_hash.clone(),
            started_at: event.started_at,
            completed_at: event.completed_at,
            received_at: stored.received_at,
        })
    }

    /// Rebuild the wire event from a row.
    pub fn into_stored(self) -> StoredEvent {
        let from_blob = |bytes: &[u8]| -> serde_json::Value {
            serde_json::from_slice(bytes).unwrap_or(serde_json::Value::Null)
        };

        let has_meta = self.model_id.is_some()
            || self.model_hash.is_some()
            || self.temperature.is_some()
            || self.seed.is_some()
            || self.max_tokens.is_some()
            || self.tool_calls.is_some()
            || self.sdk_version.is_some()
            || self.sdk_language.is_some()
            || self.tags.is_some();

        let execution_meta = has_meta.then(|| ExecutionMeta {
            model_id: self.model_id,
            model_hash: self.model_hash,
            temperature: self.temperature,
            seed: self.seed,
            max_tokens: self.max_tokens,
            tool_calls: self.tool_calls.as_deref().map(from_blob),
            sdk_version: self.sdk_version.unwrap_or_default(),
            sdk_language: self.sdk_language.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
        });

        StoredEvent {
            event: Event {
                facto_id: FactoId(self.facto_id),
                agent_id: AgentId(self.agent_id),
                session_id: SessionId(self.session_id),
                parent_facto_id: self.parent_facto_id.map(FactoId),
                action_type: self.action_type,
                status: self.status,
                input_data: from_blob(&self.input_data),
                output_data: from_blob(&self.output_data),
                execution_meta,
                proof: Proof {
                    signature: BASE64.encode(&self.signature),
                    public_key: BASE64.encode(&self.public_key),
                    prev_hash: self.prev_hash,
                    event_hash: self.event_hash,
                },
                started_at: self.started_at,
                completed_at: self.completed_at,
            },
            received_at: self.received_at,
        }
    }
}
