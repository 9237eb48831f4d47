//! Operational endpoints: liveness and Prometheus scrape.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use itinerary::IdentityValidator;
use metrics_exporter_prometheus::PrometheusHandle;
use ranking::RankingCache;
use serde::Serialize;

use crate::{AppState, ContentStore};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health: `200 ok` while serving, `503 draining` once shutdown began.
pub async fn health<S, R, V>(
    State(state): State<Arc<AppState<S, R, V>>>,
) -> (StatusCode, Json<HealthResponse>)
where
    S: ContentStore,
    R: RankingCache + 'static,
    V: IdentityValidator + Clone + 'static,
{
    let (status, label) = if state.shutdown.is_cancelled() {
        (StatusCode::SERVICE_UNAVAILABLE, "draining")
    } else {
        (StatusCode::OK, "ok")
    };
    (
        status,
        Json(HealthResponse {
            status: label,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// GET /metrics: Prometheus text exposition.
pub async fn metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
