//! Content-extraction capability abstraction
//!
//! Retrieves the readable text of one source document. The real
//! readability heuristics live outside this service; the HTTP
//! implementation here does only coarse markup removal so the pipeline
//! has usable text to work with.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Raw material extracted from one document
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub title: String,
    pub description: String,
    pub content: String,
}

/// Trait for content extraction
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract the readable content of the document at `url`
    async fn extract(&self, url: &Url) -> Result<ExtractedContent>;
}

/// HTTP extractor: fetches the document and strips markup
pub struct HttpExtractor {
    client: reqwest::Client,
    title_re: Regex,
    description_re: Regex,
    block_re: Regex,
    tag_re: Regex,
    space_re: Regex,
}

impl HttpExtractor {
    /// Create a new HTTP extractor
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            title_re: Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex"),
            description_re: Regex::new(
                r#"(?is)<meta[^>]+name\s*=\s*["']description["'][^>]*content\s*=\s*["']([^"']*)["']"#,
            )
            .expect("static regex"),
            block_re: Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")
                .expect("static regex"),
            tag_re: Regex::new(r"(?s)<[^>]+>").expect("static regex"),
            space_re: Regex::new(r"\s+").expect("static regex"),
        })
    }

    fn strip_markup(&self, html: &str) -> String {
        let without_blocks = self.block_re.replace_all(html, " ");
        let without_tags = self.tag_re.replace_all(&without_blocks, " ");
        self.space_re.replace_all(&without_tags, " ").trim().to_string()
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, url: &Url) -> Result<ExtractedContent> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| AppError::ExtractionError {
                message: format!("Fetch failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExtractionError {
                message: format!("Fetch failed with status {}", response.status()),
            });
        }

        let body = response.text().await.map_err(|e| AppError::ExtractionError {
            message: format!("Failed to read response body: {}", e),
        })?;

        let title = self
            .title_re
            .captures(&body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let description = self
            .description_re
            .captures(&body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        Ok(ExtractedContent {
            title,
            description,
            content: self.strip_markup(&body),
        })
    }
}

/// Mock extractor for testing
///
/// Serves canned content per URL; unknown URLs and URLs registered as
/// failing return `ExtractionError`.
#[derive(Default)]
pub struct MockExtractor {
    pages: std::collections::HashMap<String, ExtractedContent>,
    failures: std::collections::HashMap<String, String>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page served for `url`
    pub fn with_page(mut self, url: &str, title: &str, content: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            ExtractedContent {
                title: title.to_string(),
                description: String::new(),
                content: content.to_string(),
            },
        );
        self
    }

    /// Register a failure for `url`
    pub fn with_failure(mut self, url: &str, reason: &str) -> Self {
        self.failures.insert(url.to_string(), reason.to_string());
        self
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(&self, url: &Url) -> Result<ExtractedContent> {
        if let Some(reason) = self.failures.get(url.as_str()) {
            return Err(AppError::ExtractionError {
                message: reason.clone(),
            });
        }

        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| AppError::ExtractionError {
                message: format!("No content registered for {}", url),
            })
    }
}

/// Create an extractor based on configuration
pub fn create_extractor(config: &crate::config::ExtractionConfig) -> Result<Arc<dyn Extractor>> {
    match config.provider.as_str() {
        "http" => Ok(Arc::new(HttpExtractor::new(
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )?)),
        "mock" => Ok(Arc::new(MockExtractor::new())),
        other => {
            tracing::warn!(provider = other, "Unknown extraction provider, using mock");
            Ok(Arc::new(MockExtractor::new()))
        }
    }
}
