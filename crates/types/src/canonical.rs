//! Canonical serialization of events.
//!
//! The canonical form is the single bit-exact byte string all producers and
//! verifiers hash and sign. Two implementations that disagree by one byte
//! produce irreconcilable audit trails, so the rules are fixed:
//!
//! - exactly twelve top-level keys: `action_type`, `agent_id`,
//!   `completed_at`, `execution_meta`, `facto_id`, `input_data`,
//!   `output_data`, `parent_facto_id`, `prev_hash`, `session_id`,
//!   `started_at`, `status`
//! - keys sorted lexicographically at every nesting level
//! - no insignificant whitespace, numbers in shortest round-trip form, UTF-8
//! - `proof.signature` and `proof.event_hash` are excluded (they are the
//!   outputs); `prev_hash` is included (it is the chain pointer)
//! - `parent_facto_id` serializes as `null` when absent
//!
//! Inside `execution_meta` only `model_id`, `sdk_version`, `seed`,
//! `temperature` and `tool_calls` are signed. `model_hash`, `max_tokens`,
//! `tags` and `sdk_language` are deliberately left out of the canonical
//! form for wire compatibility with existing signers; auditors should treat
//! those fields as not tamper-evident. `model_id` and `temperature` are
//! omitted when null while `seed` and `tool_calls` serialize as `null`.
//!
//! Sorting is done explicitly here rather than trusting any serializer's
//! map ordering.

use crate::Event;
use serde_json::{Map, Value};

/// Produce the canonical bytes of an event.
///
/// Deterministic: serializing the same event twice yields byte-identical
/// output, regardless of the key order of `input_data` / `output_data` as
/// they arrived.
pub fn canonical_bytes(event: &Event) -> Vec<u8> {
    let mut root = Map::new();
    root.insert(
        "action_type".to_string(),
        Value::String(event.action_type.clone()),
    );
    root.insert(
        "agent_id".to_string(),
        Value::String(event.agent_id.as_str().to_string()),
    );
    root.insert("completed_at".to_string(), Value::from(event.completed_at));
    root.insert("execution_meta".to_string(), meta_value(event));
    root.insert(
        "facto_id".to_string(),
        Value::String(event.facto_id.as_str().to_string()),
    );
    root.insert("input_data".to_string(), event.input_data.clone());
    root.insert("output_data".to_string(), event.output_data.clone());
    root.insert(
        "parent_facto_id".to_string(),
        match &event.parent_facto_id {
            Some(id) => Value::String(id.as_str().to_string()),
            None => Value::Null,
        },
    );
    root.insert(
        "prev_hash".to_string(),
        Value::String(event.proof.prev_hash.clone()),
    );
    root.insert(
        "session_id".to_string(),
        Value::String(event.session_id.as_str().to_string()),
    );
    root.insert("started_at".to_string(), Value::from(event.started_at));
    root.insert("status".to_string(), Value::String(event.status.clone()));

    let mut out = Vec::with_capacity(256);
    write_value(&Value::Object(root), &mut out);
    out
}

/// Build the signed subset of `execution_meta`, or `null` when absent.
fn meta_value(event: &Event) -> Value {
    let Some(meta) = &event.execution_meta else {
        return Value::Null;
    };

    let mut map = Map::new();
    if let Some(model_id) = &meta.model_id {
        map.insert("model_id".to_string(), Value::String(model_id.clone()));
    }
    map.insert(
        "sdk_version".to_string(),
        Value::String(meta.sdk_version.clone()),
    );
    map.insert(
        "seed".to_string(),
        meta.seed.map(Value::from).unwrap_or(Value::Null),
    );
    if let Some(temperature) = meta.temperature {
        map.insert("temperature".to_string(), Value::from(temperature));
    }
    map.insert(
        "tool_calls".to_string(),
        meta.tool_calls.clone().unwrap_or(Value::Null),
    );
    Value::Object(map)
}

/// Recursively write a JSON value, sorting object keys at every level.
///
/// Scalars are delegated to serde_json's serializer, which emits shortest
/// round-trip numbers and correct string escaping.
fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_scalar(&Value::String((*key).clone()), out);
                out.push(b':');
                write_value(&map[*key], out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out);
            }
            out.push(b']');
        }
        scalar => write_scalar(scalar, out),
    }
}

fn write_scalar(value: &Value, out: &mut Vec<u8>) {
    // Writing a scalar to a Vec cannot fail.
    serde_json::to_writer(&mut *out, value).expect("scalar serialization is infallible");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AgentId, ExecutionMeta, FactoId, Proof, SessionId};
    use serde_json::json;

    fn base_event() -> Event {
        Event {
            facto_id: FactoId("ft-1".to_string()),
            agent_id: AgentId::new("agent-a"),
            session_id: SessionId("session-aa".to_string()),
            parent_facto_id: None,
            action_type: "llm_call".to_string(),
            status: "success".to_string(),
            input_data: json!({"b": 2, "a": 1}),
            output_data: json!({"text": "hello"}),
            execution_meta: Some(ExecutionMeta {
                model_id: Some("m1".to_string()),
                model_hash: Some("deadbeef".to_string()),
                temperature: Some(0.7),
                seed: Some(42),
                max_tokens: Some(1024),
                tool_calls: Some(json!([])),
                sdk_version: "0.1.0".to_string(),
                sdk_language: "rust".to_string(),
                tags: [("env".to_string(), "test".to_string())].into(),
            }),
            proof: Proof {
                signature: String::new(),
                public_key: String::new(),
                prev_hash: "0".repeat(64),
                event_hash: String::new(),
            },
            started_at: 100,
            completed_at: 200,
        }
    }

    #[test]
    fn test_canonical_deterministic() {
        let event = base_event();
        assert_eq!(canonical_bytes(&event), canonical_bytes(&event));
    }

    #[test]
    fn test_keys_sorted_at_every_level() {
        let event = base_event();
        let text = String::from_utf8(canonical_bytes(&event)).unwrap();

        // Top level starts with action_type and ends with status.
        assert!(text.starts_with("{\"action_type\":"));
        assert!(text.ends_with("\"status\":\"success\"}"));

        // Nested input_data keys come out sorted regardless of insertion order.
        assert!(text.contains("\"input_data\":{\"a\":1,\"b\":2}"));
    }

    #[test]
    fn test_input_key_order_does_not_matter() {
        let mut reordered = base_event();
        reordered.input_data = json!({"a": 1, "b": 2});
        assert_eq!(canonical_bytes(&base_event()), canonical_bytes(&reordered));
    }

    #[test]
    fn test_signature_and_event_hash_excluded() {
        let mut event = base_event();
        let before = canonical_bytes(&event);

        event.proof.signature = "tampered".to_string();
        event.proof.event_hash = "f".repeat(64);
        assert_eq!(before, canonical_bytes(&event));

        // prev_hash IS part of the canonical form.
        event.proof.prev_hash = "f".repeat(64);
        assert_ne!(before, canonical_bytes(&event));
    }

    #[test]
    fn test_meta_omissions() {
        let event = base_event();
        let text = String::from_utf8(canonical_bytes(&event)).unwrap();

        // Unsigned meta fields never appear.
        assert!(!text.contains("model_hash"));
        assert!(!text.contains("max_tokens"));
        assert!(!text.contains("tags"));
        assert!(!text.contains("sdk_language"));

        // Signed subset appears in sorted order.
        assert!(text.contains(
            "\"execution_meta\":{\"model_id\":\"m1\",\"sdk_version\":\"0.1.0\",\
             \"seed\":42,\"temperature\":0.7,\"tool_calls\":[]}"
        ));
    }

    #[test]
    fn test_null_model_id_and_temperature_omitted_seed_kept() {
        let mut event = base_event();
        let meta = event.execution_meta.as_mut().unwrap();
        meta.model_id = None;
        meta.temperature = None;
        meta.seed = None;
        meta.tool_calls = None;

        let text = String::from_utf8(canonical_bytes(&event)).unwrap();
        assert!(text.contains(
            "\"execution_meta\":{\"sdk_version\":\"0.1.0\",\"seed\":null,\"tool_calls\":null}"
        ));
    }

    #[test]
    fn test_absent_meta_and_parent_serialize_as_null() {
        let mut event = base_event();
        event.execution_meta = None;
        event.parent_facto_id = None;

        let text = String::from_utf8(canonical_bytes(&event)).unwrap();
        assert!(text.contains("\"execution_meta\":null"));
        assert!(text.contains("\"parent_facto_id\":null"));
    }

    #[test]
    fn test_no_whitespace_shortest_numbers() {
        let mut event = base_event();
        event.input_data = json!({"f": 0.5, "i": 1000000000000i64});
        let text = String::from_utf8(canonical_bytes(&event)).unwrap();

        assert!(!text.contains(' '));
        assert!(text.contains("\"f\":0.5"));
        assert!(text.contains("\"i\":1000000000000"));
    }
}
