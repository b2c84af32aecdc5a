//! Content collection handler
//!
//! Maps the host layer's `getContent` message onto the aggregator: the
//! fetched text of every fetchable source, no model involvement.

use crate::handlers::{to_descriptors, SourceInput};
use crate::AppState;
use axum::{extract::State, Json};
use contextflow_common::errors::{AppError, Result};
use contextflow_common::metrics::RequestMetrics;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ContentRequest {
    #[validate(length(min = 1, max = 32, message = "between 1 and 32 sources required"))]
    pub sources: Vec<SourceInput>,
}

#[derive(Serialize)]
pub struct ContentResponse {
    pub success: bool,
    pub sources: Vec<SourceView>,
}

#[derive(Serialize)]
pub struct SourceView {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub content: String,
    pub content_length: usize,
}

/// Collect extracted content from every fetchable source
pub async fn collect_content(
    State(state): State<AppState>,
    Json(request): Json<ContentRequest>,
) -> Result<Json<ContentResponse>> {
    let metrics = RequestMetrics::start("POST", "/v1/content");

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let descriptors = to_descriptors(&request.sources);
    let sources = state.pipeline.collect_sources(&descriptors).await?;

    tracing::info!(
        requested = request.sources.len(),
        fetched = sources.len(),
        "Content collected"
    );

    let response = ContentResponse {
        success: true,
        sources: sources
            .into_iter()
            .map(|s| SourceView {
                id: s.id,
                title: s.title,
                url: s.locator,
                content: s.content,
                content_length: s.content_length,
            })
            .collect(),
    };

    metrics.finish(200);
    Ok(Json(response))
}
