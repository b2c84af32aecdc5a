//! Analysis handler
//!
//! Maps the host layer's `analyze` message onto the synthesis pipeline:
//! per-source summaries plus cross-source connections.

use crate::handlers::{to_descriptors, SourceInput};
use crate::AppState;
use axum::{extract::State, Json};
use contextflow_common::errors::{AppError, Result};
use contextflow_common::metrics::RequestMetrics;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(length(min = 1, max = 32, message = "between 1 and 32 sources required"))]
    pub sources: Vec<SourceInput>,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub summaries: Vec<SummaryView>,
    pub connections: Vec<String>,
}

#[derive(Serialize)]
pub struct SummaryView {
    pub title: String,
    pub url: String,
    pub summary: String,
}

/// Summarize every source and identify cross-source connections
pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>> {
    let metrics = RequestMetrics::start("POST", "/v1/analyze");

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let descriptors = to_descriptors(&request.sources);
    let analysis = state.pipeline.summarize_all(&descriptors).await?;

    let response = AnalyzeResponse {
        success: true,
        summaries: analysis
            .summaries
            .into_iter()
            .map(|s| SummaryView {
                title: s.title,
                url: s.locator,
                summary: s.summary,
            })
            .collect(),
        connections: analysis.connections,
    };

    metrics.finish(200);
    Ok(Json(response))
}
