//! Axum router for the `/v1` query surface.

use crate::service::{EventPage, ListParams, QueryService};
use crate::ApiError;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use facto_types::Event;
use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

lazy_static! {
    static ref REQUESTS: IntCounterVec = register_int_counter_vec!(
        "facto_query_requests_total",
        "Requests served, by endpoint",
        &["endpoint"]
    )
    .unwrap();
}

/// Build the HTTP surface over a query service.
pub fn router(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/v1/events", get(list_events))
        .route("/v1/events/{facto_id}", get(get_event))
        .route("/v1/sessions/{session_id}/events", get(session_events))
        .route("/v1/verify", post(verify_single))
        .route("/v1/verify/chain", get(verify_chain))
        .route("/v1/evidence-package", get(evidence_package))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(service)
}

async fn list_events(
    State(service): State<Arc<QueryService>>,
    Query(params): Query<ListParams>,
) -> Result<Json<EventPage>, ApiError> {
    REQUESTS.with_label_values(&["events"]).inc();
    service.list_events(params).await.map(Json)
}

async fn get_event(
    State(service): State<Arc<QueryService>>,
    Path(facto_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    REQUESTS.with_label_values(&["event"]).inc();
    service.get_event(&facto_id).await.map(Json)
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    limit: Option<usize>,
    cursor: Option<String>,
}

async fn session_events(
    State(service): State<Arc<QueryService>>,
    Path(session_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<EventPage>, ApiError> {
    REQUESTS.with_label_values(&["session_events"]).inc();
    service
        .session_events(&session_id, page.limit, page.cursor)
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
struct VerifyBody {
    event: Event,
}

async fn verify_single(
    State(_service): State<Arc<QueryService>>,
    Json(body): Json<VerifyBody>,
) -> impl IntoResponse {
    REQUESTS.with_label_values(&["verify"]).inc();
    Json(QueryService::verify_single(&body.event))
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

async fn verify_chain(
    State(service): State<Arc<QueryService>>,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    REQUESTS.with_label_values(&["verify_chain"]).inc();
    service.verify_chain(&query.session_id).await.map(Json)
}

async fn evidence_package(
    State(service): State<Arc<QueryService>>,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    REQUESTS.with_label_values(&["evidence_package"]).inc();
    service.evidence_package(&query.session_id).await.map(Json)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&prometheus::gather()) {
        Ok(body) => (axum::http::StatusCode::OK, body),
        Err(e) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            e.to_string(),
        ),
    }
}
