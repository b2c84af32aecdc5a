//! Source descriptors and per-source fetching
//!
//! A source is one open document contributing content to a pipeline run.
//! Fetching is failure-isolated: every error becomes a typed
//! `FetchFailure` for that source and never aborts sibling fetches.

use chrono::{DateTime, Utc};
use contextflow_common::extract::Extractor;
use contextflow_common::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use url::Url;
use uuid::Uuid;

/// Locator schemes eligible for content extraction
pub const FETCHABLE_SCHEMES: &[&str] = &["http", "https"];

/// One document offered to the pipeline by the host layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Identifier for this document within the run
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Document title as reported by the host
    pub title: String,

    /// Document locator (URI)
    pub locator: String,
}

impl SourceDescriptor {
    pub fn new(title: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            locator: locator.into(),
        }
    }

    /// Whether this descriptor's locator carries a fetchable scheme
    ///
    /// Descriptors outside the whitelist are skipped upstream without
    /// being counted as failures.
    pub fn is_fetchable(&self) -> bool {
        match Url::parse(&self.locator) {
            Ok(url) => FETCHABLE_SCHEMES.contains(&url.scheme()),
            Err(_) => false,
        }
    }
}

/// Successfully fetched source content
///
/// Invariant: `content` is non-empty. Sources whose extraction yields
/// nothing are reported as `FetchFailure`, not as empty records.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub id: Uuid,
    pub title: String,
    pub locator: String,
    pub content: String,
    pub content_length: usize,
    pub fetched_at: DateTime<Utc>,
}

/// One source's failure to produce content
#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub descriptor: SourceDescriptor,
    pub reason: String,
}

/// Fetches the content of one source at a time
pub struct SourceFetcher {
    extractor: Arc<dyn Extractor>,
    max_content_chars: usize,
}

impl SourceFetcher {
    pub fn new(extractor: Arc<dyn Extractor>, max_content_chars: usize) -> Self {
        Self {
            extractor,
            max_content_chars,
        }
    }

    /// Fetch one source, converting every failure into `FetchFailure`
    ///
    /// Content is truncated to the configured hard cap at the extraction
    /// boundary.
    pub async fn fetch(
        &self,
        descriptor: &SourceDescriptor,
    ) -> std::result::Result<Source, FetchFailure> {
        let start = Instant::now();

        let url = match Url::parse(&descriptor.locator) {
            Ok(url) => url,
            Err(e) => {
                metrics::record_fetch(0.0, false);
                return Err(FetchFailure {
                    descriptor: descriptor.clone(),
                    reason: format!("Invalid locator: {}", e),
                });
            }
        };

        let extracted = match self.extractor.extract(&url).await {
            Ok(extracted) => extracted,
            Err(e) => {
                metrics::record_fetch(0.0, false);
                return Err(FetchFailure {
                    descriptor: descriptor.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let content: String = extracted.content.chars().take(self.max_content_chars).collect();
        if content.is_empty() {
            metrics::record_fetch(0.0, false);
            return Err(FetchFailure {
                descriptor: descriptor.clone(),
                reason: "Extraction produced no content".to_string(),
            });
        }

        let content_length = content.chars().count();
        metrics::record_fetch(start.elapsed().as_secs_f64(), true);
        tracing::debug!(
            source_id = %descriptor.id,
            title = %descriptor.title,
            content_length,
            "Source fetched"
        );

        Ok(Source {
            id: descriptor.id,
            title: descriptor.title.clone(),
            locator: descriptor.locator.clone(),
            content,
            content_length,
            fetched_at: Utc::now(),
        })
    }
}
