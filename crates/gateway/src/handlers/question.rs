//! Question answering handler
//!
//! Maps the host layer's `answerQuestion` message onto the synthesis
//! pipeline: one grounded answer plus a citation per aggregated source.

use crate::handlers::{to_descriptors, SourceInput};
use crate::AppState;
use axum::{extract::State, Json};
use contextflow_common::errors::{AppError, Result};
use contextflow_common::metrics::RequestMetrics;
use contextflow_pipeline::parser;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct QuestionRequest {
    #[validate(length(min = 1, max = 32, message = "between 1 and 32 sources required"))]
    pub sources: Vec<SourceInput>,

    #[validate(length(min = 1, max = 2000))]
    pub question: String,
}

#[derive(Serialize)]
pub struct QuestionResponse {
    pub success: bool,
    pub answer: String,
    pub sources: Vec<CitationView>,
}

#[derive(Serialize)]
pub struct CitationView {
    pub title: String,
    pub url: String,
    pub label: String,
}

/// Answer a free-form question grounded in the combined source context
pub async fn answer_question(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>> {
    let metrics = RequestMetrics::start("POST", "/v1/question");

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let descriptors = to_descriptors(&request.sources);
    let answer = state.pipeline.answer(&descriptors, &request.question).await?;

    let response = QuestionResponse {
        success: true,
        answer: answer.answer,
        sources: answer
            .sources
            .into_iter()
            .map(|citation| CitationView {
                label: parser::citation_label(&citation.locator),
                title: citation.title,
                url: citation.locator,
            })
            .collect(),
    };

    metrics.finish(200);
    Ok(Json(response))
}
