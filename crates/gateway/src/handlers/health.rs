//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use contextflow_common::model::Availability;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub model: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - checks the generation capability
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let availability = state.model.availability().await;
    let model_check = CheckResult {
        status: match availability {
            Availability::Available => "up",
            Availability::NeedsSetup => "needs-setup",
            Availability::Unavailable => "down",
        }
        .to_string(),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    let all_healthy = availability == Availability::Available;

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks { model: model_check },
    })
}
