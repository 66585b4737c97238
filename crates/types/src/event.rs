//! The event model.
//!
//! An event ("facto") is one recorded agent action. It is born signed in a
//! producer SDK, rides a message bus as JSON, is persisted by the batching
//! processor, and is read-only forever after.

use crate::{AgentId, FactoId, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Cryptographic proof envelope carried by every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Base64 Ed25519 signature (64 raw bytes) over the canonical form.
    pub signature: String,

    /// Base64 Ed25519 public key (32 raw bytes) of the signer.
    pub public_key: String,

    /// Hex SHA3-256 of the previous event in this session's chain, or 64
    /// zeros for the first event.
    pub prev_hash: String,

    /// Hex SHA3-256 of this event's canonical form.
    pub event_hash: String,
}

/// Execution metadata attached by the producer SDK.
///
/// Only `model_id`, `seed`, `sdk_version`, `temperature` and `tool_calls`
/// enter the canonical (signed) form; the remaining fields are carried and
/// stored but are not tamper-evident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionMeta {
    /// Model identifier, e.g. `"claude-sonnet-4"`.
    #[serde(default)]
    pub model_id: Option<String>,

    /// Hash of the model weights or container, if known.
    #[serde(default)]
    pub model_hash: Option<String>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Sampling seed.
    #[serde(default)]
    pub seed: Option<i64>,

    /// Token budget for the call.
    #[serde(default)]
    pub max_tokens: Option<i32>,

    /// Tool invocations made during the action (arbitrary JSON array).
    #[serde(default)]
    pub tool_calls: Option<serde_json::Value>,

    /// Version of the producing SDK.
    #[serde(default)]
    pub sdk_version: String,

    /// Language of the producing SDK.
    #[serde(default)]
    pub sdk_language: String,

    /// Free-form labels.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// One recorded agent action, the atomic signed event.
///
/// Field names match the JSON wire shape on the bus field-for-field.
/// Timestamps are integer nanoseconds since the UNIX epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Globally unique event id, `ft-` prefixed.
    pub facto_id: FactoId,

    /// Producer identity.
    pub agent_id: AgentId,

    /// Session grouping for chain-linking, `session-` prefixed.
    pub session_id: SessionId,

    /// Optional parent event, forming a tree within the session.
    #[serde(default)]
    pub parent_facto_id: Option<FactoId>,

    /// Free-form action label (`"llm_call"`, `"tool_use"`, ...).
    pub action_type: String,

    /// `"success"`, `"error"`, or another producer-defined label.
    pub status: String,

    /// Arbitrary JSON captured before the action.
    #[serde(default)]
    pub input_data: serde_json::Value,

    /// Arbitrary JSON captured after the action.
    #[serde(default)]
    pub output_data: serde_json::Value,

    /// Execution metadata, if the producer attached any.
    #[serde(default)]
    pub execution_meta: Option<ExecutionMeta>,

    /// Cryptographic proof envelope.
    pub proof: Proof,

    /// Action start, nanoseconds since epoch.
    pub started_at: i64,

    /// Action completion, nanoseconds since epoch.
    pub completed_at: i64,
}

/// An event as persisted by the processor.
///
/// `received_at` is stamped at flush time and is the only field the
/// pipeline adds to what the producer signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// The event exactly as it arrived on the bus.
    #[serde(flatten)]
    pub event: Event,

    /// Processor receipt time, nanoseconds since epoch.
    pub received_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event_json() -> &'static str {
        r#"{
            "facto_id": "ft-1",
            "agent_id": "agent-a",
            "session_id": "session-aa",
            "action_type": "llm_call",
            "status": "success",
            "input_data": {"prompt": "hi"},
            "output_data": {"text": "hello"},
            "execution_meta": {
                "model_id": "m1",
                "temperature": 0.7,
                "seed": 42,
                "sdk_version": "0.1.0",
                "sdk_language": "rust",
                "tags": {"env": "test"}
            },
            "proof": {
                "signature": "c2ln",
                "public_key": "cGs=",
                "prev_hash": "0000000000000000000000000000000000000000000000000000000000000000",
                "event_hash": "1111111111111111111111111111111111111111111111111111111111111111"
            },
            "started_at": 1,
            "completed_at": 2
        }"#
    }

    #[test]
    fn test_wire_roundtrip() {
        let event: Event = serde_json::from_str(sample_event_json()).unwrap();
        assert_eq!(event.facto_id.as_str(), "ft-1");
        assert_eq!(event.parent_facto_id, None);
        assert_eq!(
            event.execution_meta.as_ref().unwrap().temperature,
            Some(0.7)
        );

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_stored_event_flattens() {
        let event: Event = serde_json::from_str(sample_event_json()).unwrap();
        let stored = StoredEvent {
            event,
            received_at: 99,
        };
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["facto_id"], "ft-1");
        assert_eq!(value["received_at"], 99);
    }
}
