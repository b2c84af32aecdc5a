//! Synthesis orchestration
//!
//! Drives the ordered sequence of model calls over an aggregated source
//! collection: per-source summarization, cross-source connection
//! finding, and question answering. Each entry operation is one
//! pipeline run with its own session; prompts are issued strictly one
//! at a time against that session.

use crate::aggregate::{Aggregation, ContentAggregator};
use crate::parser;
use crate::session::SessionManager;
use crate::source::{Source, SourceDescriptor};
use contextflow_common::config::PipelineConfig;
use contextflow_common::errors::{AppError, Result};
use contextflow_common::model::{Availability, LanguageModel};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Sentinel substituted when one source's summarization prompt fails
pub const SUMMARY_SENTINEL: &str = "Summary unavailable";

/// Placeholder returned when fewer than two summaries exist
pub const NOT_ENOUGH_SOURCES: &str = "Not enough sources to find connections";

/// Summary of one source
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub source_id: Uuid,
    pub title: String,
    pub locator: String,
    pub summary: String,
}

/// Result of an analysis run: per-source summaries plus cross-source
/// connections
#[derive(Debug, Serialize)]
pub struct Analysis {
    pub summaries: Vec<Summary>,
    pub connections: Vec<String>,
}

/// Citation attached to an answer
#[derive(Debug, Clone, Serialize)]
pub struct SourceCitation {
    pub title: String,
    pub locator: String,
}

/// Grounded answer to one question
#[derive(Debug, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub sources: Vec<SourceCitation>,
}

/// Orchestrates aggregation and model calls for one service
///
/// The pipeline itself is stateless across runs: every entry operation
/// aggregates afresh and owns a run-scoped `SessionManager`, so no
/// state leaks between invocations.
pub struct SynthesisPipeline {
    model: Arc<dyn LanguageModel>,
    aggregator: ContentAggregator,
    limits: PipelineConfig,
    system_prompt: String,
}

impl SynthesisPipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        aggregator: ContentAggregator,
        limits: PipelineConfig,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            model,
            aggregator,
            limits,
            system_prompt: system_prompt.into(),
        }
    }

    /// Aggregate content from the given sources without touching the model
    pub async fn collect_sources(&self, descriptors: &[SourceDescriptor]) -> Result<Vec<Source>> {
        let aggregation = self.aggregate_or_no_content(descriptors).await?;
        Ok(aggregation.sources)
    }

    /// Summarize every source, then find cross-source connections
    ///
    /// Per-source prompt failures degrade to the sentinel summary; the
    /// run only fails outright when no content aggregates, the model is
    /// unavailable, or the session cannot be created.
    pub async fn summarize_all(&self, descriptors: &[SourceDescriptor]) -> Result<Analysis> {
        let start = Instant::now();
        let aggregation = self.aggregate_or_no_content(descriptors).await?;

        let sessions = SessionManager::new(self.model.clone(), &self.system_prompt);
        self.require_available(&sessions).await?;
        sessions.ensure_session().await?;

        let mut summaries = Vec::with_capacity(aggregation.sources.len());
        for source in &aggregation.sources {
            let content: String = source
                .content
                .chars()
                .take(self.limits.summary_input_chars)
                .collect();
            let prompt = format!(
                "Summarize this article titled \"{}\" in 1-2 concise sentences:\n\n{}",
                source.title, content
            );

            let summary = match sessions.prompt("summary", &prompt).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        source_id = %source.id,
                        title = %source.title,
                        error = %e,
                        "Summarization failed, substituting sentinel"
                    );
                    SUMMARY_SENTINEL.to_string()
                }
            };

            summaries.push(Summary {
                source_id: source.id,
                title: source.title.clone(),
                locator: source.locator.clone(),
                summary,
            });
        }

        let connections = self.find_connections(&sessions, &summaries).await;

        tracing::info!(
            sources = aggregation.sources.len(),
            summaries = summaries.len(),
            connections = connections.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        Ok(Analysis {
            summaries,
            connections,
        })
    }

    /// Answer one question grounded in the combined source context
    ///
    /// Every aggregated source is cited, whether or not the model drew
    /// on it.
    pub async fn answer(&self, descriptors: &[SourceDescriptor], question: &str) -> Result<Answer> {
        let start = Instant::now();
        let aggregation = self.aggregate_or_no_content(descriptors).await?;

        let context = ContentAggregator::build_context(
            &aggregation.sources,
            self.limits.per_source_context_chars,
            self.limits.total_context_chars,
        );

        let sessions = SessionManager::new(self.model.clone(), &self.system_prompt);
        self.require_available(&sessions).await?;
        sessions.ensure_session().await?;

        let prompt = format!(
            "Based on the following sources, answer this question concisely: \"{}\"\n\n\
             Sources:\n{}\n\n\
             Provide a clear, comprehensive answer in 2-4 sentences.",
            question, context
        );

        // Single-shot prompt: a failure degrades the answer text, it does
        // not fail the run.
        let answer = match sessions.prompt("answer", &prompt).await {
            Ok(text) => text,
            Err(e) => format!("Unable to answer the question: {}", e),
        };

        let sources = aggregation
            .sources
            .iter()
            .map(|s| SourceCitation {
                title: s.title.clone(),
                locator: s.locator.clone(),
            })
            .collect();

        tracing::info!(
            sources = aggregation.sources.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(Answer {
            question: question.to_string(),
            answer,
            sources,
        })
    }

    async fn aggregate_or_no_content(
        &self,
        descriptors: &[SourceDescriptor],
    ) -> Result<Aggregation> {
        let aggregation = self
            .aggregator
            .aggregate(descriptors, self.limits.max_sources)
            .await;
        if aggregation.is_empty() {
            return Err(AppError::NoContent);
        }
        Ok(aggregation)
    }

    async fn require_available(&self, sessions: &SessionManager) -> Result<()> {
        match sessions.check_availability().await {
            Availability::Available => Ok(()),
            Availability::Unavailable => Err(AppError::ModelUnavailable {
                message: "Language model is not ready. Verify the model endpoint is reachable."
                    .to_string(),
            }),
            Availability::NeedsSetup => Err(AppError::ModelUnavailable {
                message: "Language model needs setup. Configure an API key for the model service."
                    .to_string(),
            }),
        }
    }

    async fn find_connections(
        &self,
        sessions: &SessionManager,
        summaries: &[Summary],
    ) -> Vec<String> {
        if summaries.len() < 2 {
            return vec![NOT_ENOUGH_SOURCES.to_string()];
        }

        let blocks = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| format!("Source {} - {}:\n{}", i + 1, s.title, s.summary))
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Analyze these article summaries and identify 3-4 key connections, common \
             themes, or interesting comparisons between them. Format each as a single \
             clear sentence:\n\n{}",
            blocks
        );

        // Single-shot prompt: degrade to an explanatory message on failure.
        match sessions.prompt("connections", &prompt).await {
            Ok(raw) => parser::parse_connections(&raw),
            Err(e) => vec![format!("Unable to find connections: {}", e)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFetcher;
    use contextflow_common::extract::MockExtractor;
    use contextflow_common::model::MockLanguageModel;

    fn pipeline(
        extractor: MockExtractor,
        model: Arc<MockLanguageModel>,
    ) -> SynthesisPipeline {
        let fetcher = SourceFetcher::new(Arc::new(extractor), 10_000);
        SynthesisPipeline::new(
            model,
            ContentAggregator::new(fetcher),
            PipelineConfig::default(),
            "test system prompt",
        )
    }

    fn two_source_extractor() -> MockExtractor {
        MockExtractor::new()
            .with_page("https://a.example/", "Alpha", "Alpha article body with detail.")
            .with_page("https://b.example/", "Beta", "Beta article body with detail.")
    }

    fn two_descriptors() -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new("Alpha", "https://a.example/"),
            SourceDescriptor::new("Beta", "https://b.example/"),
        ]
    }

    #[tokio::test]
    async fn test_summarize_all_happy_path() {
        let model = Arc::new(MockLanguageModel::with_replies(vec![
            Ok("Alpha covers energy markets.".to_string()),
            Ok("Beta covers grid storage.".to_string()),
            Ok("1. Both sources examine electricity infrastructure.\n\
                2. Both cite the same regulator."
                .to_string()),
        ]));
        let pipeline = pipeline(two_source_extractor(), model.clone());

        let analysis = pipeline.summarize_all(&two_descriptors()).await.unwrap();
        assert_eq!(analysis.summaries.len(), 2);
        assert_eq!(analysis.summaries[0].summary, "Alpha covers energy markets.");
        assert_eq!(analysis.summaries[1].summary, "Beta covers grid storage.");
        assert_eq!(
            analysis.connections,
            vec![
                "Both sources examine electricity infrastructure.".to_string(),
                "Both cite the same regulator.".to_string(),
            ]
        );
        // One session serves the whole run
        assert_eq!(model.sessions_created(), 1);
        assert_eq!(model.prompts_issued(), 3);
    }

    #[tokio::test]
    async fn test_failed_summary_becomes_sentinel() {
        let extractor = MockExtractor::new()
            .with_page("https://a.example/", "Alpha", "Alpha article body with detail.")
            .with_page("https://b.example/", "Beta", "Beta article body with detail.")
            .with_page("https://c.example/", "Gamma", "Gamma article body with detail.");
        let model = Arc::new(MockLanguageModel::with_replies(vec![
            Ok("Alpha summary.".to_string()),
            Err("prompt rejected".to_string()),
            Ok("Gamma summary.".to_string()),
            Ok("All three sources discuss adjacent infrastructure topics.".to_string()),
        ]));
        let pipeline = pipeline(extractor, model);

        let descriptors = vec![
            SourceDescriptor::new("Alpha", "https://a.example/"),
            SourceDescriptor::new("Beta", "https://b.example/"),
            SourceDescriptor::new("Gamma", "https://c.example/"),
        ];

        let analysis = pipeline.summarize_all(&descriptors).await.unwrap();
        assert_eq!(analysis.summaries.len(), 3);
        assert_eq!(analysis.summaries[0].summary, "Alpha summary.");
        assert_eq!(analysis.summaries[1].summary, SUMMARY_SENTINEL);
        assert_eq!(analysis.summaries[2].summary, "Gamma summary.");
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_block_other_summaries() {
        let extractor = MockExtractor::new()
            .with_page("https://a.example/", "Alpha", "Alpha article body with detail.")
            .with_failure("https://b.example/", "connection reset");
        let model = Arc::new(MockLanguageModel::with_replies(vec![Ok(
            "Alpha summary.".to_string(),
        )]));
        let pipeline = pipeline(extractor, model);

        let analysis = pipeline.summarize_all(&two_descriptors()).await.unwrap();
        assert_eq!(analysis.summaries.len(), 1);
        assert_eq!(analysis.summaries[0].title, "Alpha");
    }

    #[tokio::test]
    async fn test_single_summary_skips_connection_prompt() {
        let extractor = MockExtractor::new().with_page(
            "https://a.example/",
            "Alpha",
            "Alpha article body with detail.",
        );
        let model = Arc::new(MockLanguageModel::with_replies(vec![Ok(
            "Alpha summary.".to_string(),
        )]));
        let pipeline = pipeline(extractor, model.clone());

        let descriptors = vec![SourceDescriptor::new("Alpha", "https://a.example/")];
        let analysis = pipeline.summarize_all(&descriptors).await.unwrap();

        assert_eq!(analysis.connections, vec![NOT_ENOUGH_SOURCES.to_string()]);
        // Only the summarization prompt was issued
        assert_eq!(model.prompts_issued(), 1);
    }

    #[tokio::test]
    async fn test_zero_sources_is_no_content_not_empty_success() {
        let model = Arc::new(MockLanguageModel::new());
        let pipeline = pipeline(
            MockExtractor::new().with_failure("https://a.example/", "down"),
            model.clone(),
        );

        let descriptors = vec![SourceDescriptor::new("Alpha", "https://a.example/")];
        let result = pipeline.summarize_all(&descriptors).await;
        assert!(matches!(result, Err(AppError::NoContent)));
        assert_eq!(model.prompts_issued(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_model_is_fatal_before_any_session() {
        let model = Arc::new(
            MockLanguageModel::new().with_availability(Availability::Unavailable),
        );
        let pipeline = pipeline(two_source_extractor(), model.clone());

        let result = pipeline.summarize_all(&two_descriptors()).await;
        assert!(matches!(result, Err(AppError::ModelUnavailable { .. })));
        assert_eq!(model.sessions_created(), 0);
    }

    #[tokio::test]
    async fn test_session_creation_failure_is_fatal() {
        let model = Arc::new(MockLanguageModel::new().failing_creation());
        let pipeline = pipeline(two_source_extractor(), model);

        let result = pipeline.summarize_all(&two_descriptors()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_connection_prompt_failure_degrades() {
        let model = Arc::new(MockLanguageModel::with_replies(vec![
            Ok("Alpha summary.".to_string()),
            Ok("Beta summary.".to_string()),
            Err("rate limited".to_string()),
        ]));
        let pipeline = pipeline(two_source_extractor(), model);

        let analysis = pipeline.summarize_all(&two_descriptors()).await.unwrap();
        assert_eq!(analysis.summaries.len(), 2);
        assert_eq!(analysis.connections.len(), 1);
        assert!(analysis.connections[0].starts_with("Unable to find connections:"));
    }

    #[tokio::test]
    async fn test_answer_cites_every_source() {
        let model = Arc::new(MockLanguageModel::with_replies(vec![Ok(
            "Both sources agree on the trend.".to_string(),
        )]));
        let pipeline = pipeline(two_source_extractor(), model.clone());

        let answer = pipeline
            .answer(&two_descriptors(), "What is the common trend?")
            .await
            .unwrap();

        assert_eq!(answer.answer, "Both sources agree on the trend.");
        assert_eq!(answer.sources.len(), 2);
        assert_eq!(answer.sources[0].title, "Alpha");
        assert_eq!(answer.sources[1].locator, "https://b.example/");
        assert_eq!(model.sessions_created(), 1);

        // Citation labels never panic, whatever the locator
        for citation in &answer.sources {
            let _ = parser::citation_label(&citation.locator);
        }
    }

    #[tokio::test]
    async fn test_answer_prompt_failure_degrades() {
        let model = Arc::new(MockLanguageModel::with_replies(vec![Err(
            "timeout".to_string(),
        )]));
        let pipeline = pipeline(two_source_extractor(), model);

        let answer = pipeline
            .answer(&two_descriptors(), "What happened?")
            .await
            .unwrap();
        assert!(answer.answer.starts_with("Unable to answer the question:"));
        assert_eq!(answer.sources.len(), 2);
    }

    #[tokio::test]
    async fn test_answer_with_no_sources_is_no_content() {
        let model = Arc::new(MockLanguageModel::new());
        let pipeline = pipeline(MockExtractor::new(), model);

        let descriptors = vec![SourceDescriptor::new("Nope", "about:blank")];
        let result = pipeline.answer(&descriptors, "Anything?").await;
        assert!(matches!(result, Err(AppError::NoContent)));
    }

    #[tokio::test]
    async fn test_collect_sources_returns_content() {
        let model = Arc::new(MockLanguageModel::new());
        let pipeline = pipeline(two_source_extractor(), model.clone());

        let sources = pipeline.collect_sources(&two_descriptors()).await.unwrap();
        assert_eq!(sources.len(), 2);
        assert!(!sources[0].content.is_empty());
        // No model involvement at all
        assert_eq!(model.sessions_created(), 0);
    }
}
