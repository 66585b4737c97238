//! Signed-event fixtures.

use facto_sdk::{EventDraft, EventRecorder};
use facto_types::{AgentId, Event, KeyPair, StoredEvent};
use serde_json::json;

/// Deterministic base timestamp for fixtures (2023-11-14T22:13:20Z).
pub const BASE_NANOS: i64 = 1_700_000_000_000_000_000;

/// A recorder with a fresh random keypair for the given agent.
pub fn test_recorder(agent_id: &str) -> EventRecorder {
    EventRecorder::new(KeyPair::generate(), AgentId::new(agent_id))
}

/// A draft with fixed timestamps `BASE_NANOS + index` milliseconds apart.
pub fn sample_draft(action_type: &str, index: i64) -> EventDraft {
    let at = BASE_NANOS + index * 1_000_000;
    EventDraft {
        action_type: action_type.to_string(),
        status: "success".to_string(),
        input_data: json!({"step": index}),
        output_data: json!({"ok": true}),
        started_at: Some(at),
        completed_at: Some(at),
        ..Default::default()
    }
}

/// A chained sequence of `count` signed events from one session.
pub fn session_events(recorder: &mut EventRecorder, count: usize) -> Vec<Event> {
    (0..count)
        .map(|i| recorder.record(sample_draft("llm_call", i as i64)))
        .collect()
}

/// Wrap an event the way the processor does at flush time.
pub fn stored(event: Event) -> StoredEvent {
    let received_at = event.completed_at + 1;
    StoredEvent { event, received_at }
}
