//! HTTP surface behavior against the in-memory store.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use facto_core::{EventStore, Projection};
use facto_query::{router, QueryService};
use facto_test_helpers::{sample_draft, session_events, stored, test_recorder, MemoryStore};
use facto_types::{verify_proof, Event, Hash};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn seed(store: &MemoryStore, events: &[Event]) {
    let wrapped: Vec<_> = events.iter().cloned().map(stored).collect();
    for projection in Projection::ALL {
        store.write_projection(projection, &wrapped).await.unwrap();
    }
}

fn app(store: Arc<MemoryStore>) -> axum::Router {
    router(Arc::new(QueryService::new(store)))
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn list_events_in_window_with_pagination() {
    let store = Arc::new(MemoryStore::new());
    let mut recorder = test_recorder("agent-list");
    let events = session_events(&mut recorder, 5);
    seed(&store, &events).await;
    let app = app(store);

    let base = "/v1/events?agent_id=agent-list\
                &start=2023-11-14T00:00:00Z&end=2023-11-15T00:00:00Z";

    let (status, body) = get_json(&app, &format!("{base}&limit=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"].as_array().unwrap().len(), 3);
    let cursor = body["next_cursor"].as_str().unwrap().to_string();
    assert_eq!(body["events"][0]["facto_id"], events[0].facto_id.as_str());

    // The cursor resumes exactly after the last returned event. Clients
    // percent-encode it like any query value.
    let encoded = cursor
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D");
    let (status, body) = get_json(&app, &format!("{base}&limit=3&cursor={encoded}")).await;
    assert_eq!(status, StatusCode::OK);
    let page2 = body["events"].as_array().unwrap();
    assert_eq!(page2.len(), 2);
    assert_eq!(page2[0]["facto_id"], events[3].facto_id.as_str());
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn list_events_rejects_bad_input() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store);

    let (status, _) = get_json(&app, "/v1/events?agent_id=a&limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/v1/events?agent_id=a&start=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/v1/events?agent_id=a&cursor=%21%21").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn point_lookup_and_404() {
    let store = Arc::new(MemoryStore::new());
    let mut recorder = test_recorder("agent-point");
    let events = session_events(&mut recorder, 1);
    seed(&store, &events).await;
    let app = app(store);

    let (status, body) =
        get_json(&app, &format!("/v1/events/{}", events[0].facto_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["facto_id"], events[0].facto_id.as_str());
    assert_eq!(body["proof"]["event_hash"], events[0].proof.event_hash);

    let (status, _) = get_json(&app, "/v1/events/ft-missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_walk_is_ordered_and_404s_when_empty() {
    let store = Arc::new(MemoryStore::new());
    let mut recorder = test_recorder("agent-walk");
    let events = session_events(&mut recorder, 3);
    seed(&store, &events).await;
    let app = app(store);

    let (status, body) = get_json(
        &app,
        &format!("/v1/sessions/{}/events", events[0].session_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["events"].as_array().unwrap();
    assert_eq!(listed.len(), 3);
    for (got, expected) in listed.iter().zip(&events) {
        assert_eq!(got["facto_id"], expected.facto_id.as_str());
    }

    let (status, _) = get_json(&app, "/v1/sessions/session-missing/events").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verify_endpoint_reports_checks_without_throwing() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store);

    let mut recorder = test_recorder("agent-verify");
    let mut event = recorder.record(sample_draft("llm_call", 0));

    let request = |event: &Event| {
        Request::builder()
            .method("POST")
            .uri("/v1/verify")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_vec(&serde_json::json!({ "event": event })).unwrap(),
            ))
            .unwrap()
    };

    let response = app.clone().oneshot(request(&event)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["valid"], true);
    assert_eq!(body["checks"]["hash_valid"], true);
    assert_eq!(body["checks"]["signature_valid"], true);
    assert!(body["checks"]["chain_valid"].is_null());

    // Tampering flips the checks but stays a 200 with booleans.
    event.status = "error".to_string();
    let response = app.clone().oneshot(request(&event)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["valid"], false);
    assert_eq!(body["checks"]["hash_valid"], false);
    assert_eq!(body["checks"]["signature_valid"], false);
}

#[tokio::test]
async fn chain_verify_reports_intact_two_event_chain() {
    let store = Arc::new(MemoryStore::new());
    let mut recorder = test_recorder("agent-chain");
    let events = session_events(&mut recorder, 2);
    seed(&store, &events).await;
    let app = app(store);

    let (status, body) = get_json(
        &app,
        &format!("/v1/verify/chain?session_id={}", events[0].session_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["event_count"], 2);
    assert_eq!(body["checks"]["all_hashes_valid"], true);
    assert_eq!(body["checks"]["all_signatures_valid"], true);
    assert_eq!(body["checks"]["chain_integrity_valid"], true);
    assert!(body["errors"].as_array().unwrap().is_empty());

    // session_hash is SHA-256 over the concatenated hex hashes.
    let concat = format!(
        "{}{}",
        events[0].proof.event_hash, events[1].proof.event_hash
    );
    assert_eq!(
        body["session_hash"],
        Hash::sha256(concat.as_bytes()).to_hex()
    );
}

#[tokio::test]
async fn chain_verify_flags_broken_link_with_culprit() {
    let store = Arc::new(MemoryStore::new());
    let mut recorder = test_recorder("agent-broken");
    let mut events = session_events(&mut recorder, 2);

    // Break the link without re-signing; hash and signature now fail too
    // because prev_hash is part of the canonical form.
    events[1].proof.prev_hash = "f".repeat(64);
    seed(&store, &events).await;
    let app = app(store);

    let (status, body) = get_json(
        &app,
        &format!("/v1/verify/chain?session_id={}", events[0].session_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["checks"]["chain_integrity_valid"], false);

    // The structured errors name the culprit event.
    let errors = body["errors"].as_array().unwrap();
    assert!(errors
        .iter()
        .any(|e| e["facto_id"] == events[1].facto_id.as_str()
            && e["error"].as_str().unwrap().contains("chain broken")));

    let (status, _) = get_json(&app, "/v1/verify/chain?session_id=session-missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn evidence_package_proofs_fold_to_root() {
    let store = Arc::new(MemoryStore::new());
    let mut recorder = test_recorder("agent-evidence");
    let events = session_events(&mut recorder, 5);
    seed(&store, &events).await;
    let app = app(store);

    let (status, body) = get_json(
        &app,
        &format!("/v1/evidence-package?session_id={}", events[0].session_id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["package_id"].as_str().unwrap().starts_with("ev-"));
    assert_eq!(body["package_id"].as_str().unwrap().len(), 19);
    assert_eq!(body["event_count"], 5);
    assert!(!body["verification_recipe"].as_str().unwrap().is_empty());

    let root = Hash::from_hex(body["merkle_root"].as_str().unwrap()).unwrap();
    let proofs = body["proofs"].as_array().unwrap();
    assert_eq!(proofs.len(), 5);

    // Every exported proof folds back to the committed root.
    for proof in proofs {
        let leaf = Hash::from_hex(proof["event_hash"].as_str().unwrap()).unwrap();
        let steps: Vec<facto_types::ProofStep> =
            serde_json::from_value(proof["proof"].clone()).unwrap();
        assert!(verify_proof(&leaf, &steps, &root));
    }
}

#[tokio::test]
async fn health_and_metrics_respond() {
    let store = Arc::new(MemoryStore::new());
    let app = app(store);

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
